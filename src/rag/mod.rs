//! Retrieval-augmented generation over uploaded PDFs.
//!
//! Documents are loaded page by page, split into overlapping chunks, embedded
//! with the selected model and kept in one SQLite store per model.

pub mod chain;
pub mod loader;
pub mod prompt;
pub mod registry;
pub mod splitter;
pub mod sqlite;
pub mod store;

pub use chain::{RetrievalChain, RetrievalOutput};
pub use registry::StoreRegistry;
pub use splitter::CharacterTextSplitter;
pub use sqlite::SqliteRagStore;
pub use store::{ChunkSearchResult, DocumentRecord, RagStore, StoredChunk};

//! Storage interface for per-model vector stores.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A stored chunk with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Original filename of the uploaded document.
    pub source: String,
    /// Content hash of the document the chunk belongs to.
    pub document_hash: String,
    /// Zero-based page index.
    pub page: u32,
    /// Optional metadata (JSON).
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

/// One ingested document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub content_hash: String,
    pub filename: String,
    pub pages: usize,
    pub chunks: usize,
    pub ingested_at: String,
}

#[async_trait]
pub trait RagStore: Send + Sync {
    /// Insert chunks with their embeddings in one transaction.
    ///
    /// Every vector must have the store's embedding dimension; the first
    /// insert into an empty store fixes it.
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError>;

    /// Insert a document's chunks and its record in one transaction.
    ///
    /// Either everything is stored or nothing is, so a failed ingestion never
    /// leaves searchable chunks behind.
    async fn insert_document(
        &self,
        record: DocumentRecord,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), ApiError>;

    /// The `limit` chunks most similar to the query, best first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    /// Total number of stored chunks.
    async fn count(&self) -> Result<usize, ApiError>;

    /// Whether a document with this content hash was already ingested.
    async fn contains_document(&self, content_hash: &str) -> Result<bool, ApiError>;

    async fn record_document(&self, record: DocumentRecord) -> Result<(), ApiError>;

    /// Ingested documents, newest first.
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, ApiError>;

    /// Dimension fixed by the first insert, if any.
    async fn embedding_dimension(&self) -> Result<Option<usize>, ApiError>;
}

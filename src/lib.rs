pub mod core;
pub mod i18n;
pub mod ingest;
pub mod lang;
pub mod llm;
pub mod models;
pub mod query;
pub mod rag;
pub mod server;
pub mod state;

//! Background worker that turns uploaded PDFs into stored chunks.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::jobs::{JobStatus, JobTracker};
use crate::core::config::RagConfig;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::rag::loader::load_pdf;
use crate::rag::splitter::{CharacterTextSplitter, TextChunk};
use crate::rag::store::{DocumentRecord, StoredChunk};
use crate::rag::StoreRegistry;

/// One queued upload. The temp file is removed when the task is dropped.
pub struct IngestTask {
    pub job_id: Uuid,
    pub model: String,
    pub filename: String,
    pub expected_dimension: Option<usize>,
    pub file: NamedTempFile,
}

#[derive(Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    Ingested { pages: usize, chunks: usize },
    AlreadyPresent,
}

pub struct IngestionWorker {
    provider: Arc<dyn LlmProvider>,
    stores: StoreRegistry,
    tracker: JobTracker,
    rag: RagConfig,
}

impl IngestionWorker {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        stores: StoreRegistry,
        tracker: JobTracker,
        rag: RagConfig,
    ) -> Self {
        Self {
            provider,
            stores,
            tracker,
            rag,
        }
    }

    /// Processes tasks one at a time, in submission order, until the channel closes.
    pub async fn run(self, mut receiver: mpsc::Receiver<IngestTask>) {
        tracing::info!("Ingestion worker started");

        while let Some(task) = receiver.recv().await {
            let job_id = task.job_id;
            let filename = task.filename.clone();
            tracing::info!("Ingesting {} for model {} (job {})", filename, task.model, job_id);

            match self.process(task).await {
                Ok(IngestOutcome::Ingested { pages, chunks }) => {
                    tracing::info!(
                        "Ingested {}: {} page(s), {} chunk(s)",
                        filename,
                        pages,
                        chunks
                    );
                    self.tracker.complete(job_id, pages, chunks).await;
                }
                Ok(IngestOutcome::AlreadyPresent) => {
                    tracing::info!("Skipped {}: already in the vector store", filename);
                    self.tracker
                        .skip(job_id, "document already present in the vector store")
                        .await;
                }
                Err(e) => {
                    tracing::error!("Ingestion of {} failed: {}", filename, e);
                    self.tracker.fail(job_id, &e.to_string()).await;
                }
            }
        }

        tracing::info!("Ingestion worker stopped");
    }

    pub async fn process(&self, task: IngestTask) -> Result<IngestOutcome, ApiError> {
        let data = tokio::fs::read(task.file.path())
            .await
            .map_err(ApiError::internal)?;
        let content_hash = hex::encode(Sha256::digest(&data));

        let store = self.stores.open(&task.model).await?;
        if store.contains_document(&content_hash).await? {
            return Ok(IngestOutcome::AlreadyPresent);
        }

        self.tracker
            .set_status(task.job_id, JobStatus::Extracting)
            .await;
        let path = task.file.path().to_path_buf();
        let source = task.filename.clone();
        let pages = tokio::task::spawn_blocking(move || load_pdf(&path, &source))
            .await
            .map_err(ApiError::internal)??;

        let splitter = CharacterTextSplitter::from_config(&self.rag)?;
        let chunks = splitter.split_documents(&pages);

        self.tracker
            .set_status(task.job_id, JobStatus::Embedding)
            .await;
        let batch_size = self.rag.embed_batch_size.max(1);
        let mut items = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size) {
            let inputs: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.provider.embed(&inputs, &task.model).await?;
            items.extend(
                batch
                    .iter()
                    .zip(embeddings)
                    .map(|(chunk, embedding)| (stored_chunk(chunk, &content_hash), embedding)),
            );
        }

        if let (Some(expected), Some((_, first))) = (task.expected_dimension, items.first()) {
            if first.len() != expected {
                tracing::warn!(
                    "Model {} produced {}-dimensional embeddings, catalog says {}",
                    task.model,
                    first.len(),
                    expected
                );
            }
        }

        // Nothing is written until every batch is embedded.
        let record = DocumentRecord {
            content_hash,
            filename: task.filename.clone(),
            pages: pages.len(),
            chunks: chunks.len(),
            ingested_at: Utc::now().to_rfc3339(),
        };
        store.insert_document(record, items).await?;

        Ok(IngestOutcome::Ingested {
            pages: pages.len(),
            chunks: chunks.len(),
        })
    }
}

fn stored_chunk(chunk: &TextChunk, content_hash: &str) -> StoredChunk {
    StoredChunk {
        chunk_id: format!("{}:{}:{}", content_hash, chunk.page, chunk.chunk_index),
        content: chunk.text.clone(),
        source: chunk.source.clone(),
        document_hash: content_hash.to_string(),
        page: chunk.page,
        metadata: Some(json!({ "chunk_index": chunk.chunk_index })),
    }
}

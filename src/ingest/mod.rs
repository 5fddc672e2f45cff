//! PDF ingestion: uploads are queued and processed by one background worker.

pub mod jobs;
pub mod worker;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

use crate::core::config::RagConfig;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::models::ModelCatalog;
use crate::rag::loader::looks_like_pdf;
use crate::rag::StoreRegistry;

pub use jobs::{IngestJob, JobStatus, JobTracker};
pub use worker::{IngestOutcome, IngestTask, IngestionWorker};

const QUEUE_CAPACITY: usize = 64;
const FALLBACK_FILENAME: &str = "document.pdf";

#[derive(Clone)]
pub struct IngestionService {
    sender: mpsc::Sender<IngestTask>,
    tracker: JobTracker,
    catalog: Arc<RwLock<ModelCatalog>>,
    upload_dir: PathBuf,
}

impl IngestionService {
    /// Creates the service and spawns its worker on the current runtime.
    pub fn start(
        provider: Arc<dyn LlmProvider>,
        stores: StoreRegistry,
        catalog: Arc<RwLock<ModelCatalog>>,
        tracker: JobTracker,
        rag: RagConfig,
        upload_dir: PathBuf,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let worker = IngestionWorker::new(provider, stores, tracker.clone(), rag);
        tokio::spawn(worker.run(receiver));

        Self::with_sender(sender, tracker, catalog, upload_dir)
    }

    /// Service feeding an existing queue; the caller owns the receiving side.
    pub fn with_sender(
        sender: mpsc::Sender<IngestTask>,
        tracker: JobTracker,
        catalog: Arc<RwLock<ModelCatalog>>,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            sender,
            tracker,
            catalog,
            upload_dir,
        }
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Queues an uploaded PDF and returns its job without waiting for extraction.
    pub async fn submit(
        &self,
        model: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<IngestJob, ApiError> {
        let expected_dimension = self.catalog.read().await.require(model)?.dimension;

        if data.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
        }
        if !looks_like_pdf(data) {
            return Err(ApiError::BadRequest(
                "Only PDF files are supported".to_string(),
            ));
        }

        let filename = display_filename(filename);
        let file = self.write_temp_copy(data)?;
        tracing::debug!(
            "Stored upload {} at {}",
            filename,
            file.path().display()
        );

        let job = IngestJob::new(model, &filename);
        self.tracker.insert(job.clone()).await;

        let task = IngestTask {
            job_id: job.id,
            model: model.to_string(),
            filename,
            expected_dimension,
            file,
        };
        if let Err(e) = self.sender.try_send(task) {
            let reason = match e {
                TrySendError::Full(_) => "ingestion queue is full",
                TrySendError::Closed(_) => "ingestion worker is not running",
            };
            self.tracker.fail(job.id, reason).await;
            return Err(ApiError::ServiceUnavailable(format!(
                "Cannot queue {}: {}",
                job.filename, reason
            )));
        }

        Ok(job)
    }

    fn write_temp_copy(&self, data: &[u8]) -> Result<tempfile::NamedTempFile, ApiError> {
        let mut file = tempfile::Builder::new()
            .prefix("docqa-")
            .suffix(".pdf")
            .tempfile_in(&self.upload_dir)
            .map_err(ApiError::internal)?;
        file.write_all(data).map_err(ApiError::internal)?;
        file.flush().map_err(ApiError::internal)?;
        Ok(file)
    }
}

/// Final path component of a client-supplied filename.
fn display_filename(raw: &str) -> String {
    let normalized = raw.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .map(|name| name.to_string_lossy().trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::config::{AppPaths, ModelConfig};
    use crate::llm::fake::FakeProvider;
    use crate::rag::loader::tests::build_pdf;

    struct Harness {
        _tmp: tempfile::TempDir,
        paths: Arc<AppPaths>,
        provider: Arc<FakeProvider>,
        stores: StoreRegistry,
        service: IngestionService,
    }

    fn rag_config() -> RagConfig {
        RagConfig {
            chunk_size: 500,
            chunk_overlap: 50,
            separator: "\n\n".to_string(),
            top_k: 1,
            embed_batch_size: 2,
        }
    }

    fn catalog() -> Arc<RwLock<ModelCatalog>> {
        Arc::new(RwLock::new(ModelCatalog::from_config(&[ModelConfig {
            name: "llama2:latest".to_string(),
            dimension: Some(16),
        }])))
    }

    fn harness(provider: FakeProvider) -> Harness {
        harness_with(provider, rag_config())
    }

    fn harness_with(provider: FakeProvider, rag: RagConfig) -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::with_data_dir(
            tmp.path().to_path_buf(),
            tmp.path().join("data"),
        ));
        let provider = Arc::new(provider);
        let stores = StoreRegistry::new(paths.clone());
        let service = IngestionService::start(
            provider.clone(),
            stores.clone(),
            catalog(),
            JobTracker::new(),
            rag,
            paths.upload_dir.clone(),
        );
        Harness {
            _tmp: tmp,
            paths,
            provider,
            stores,
            service,
        }
    }

    async fn wait_for(service: &IngestionService, job: &IngestJob) -> IngestJob {
        for _ in 0..200 {
            let current = service.tracker().get(job.id).await.unwrap();
            if current.status.is_finished() {
                return current;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {} did not finish", job.id);
    }

    fn upload_dir_is_empty(paths: &AppPaths) -> bool {
        std::fs::read_dir(&paths.upload_dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn ingests_pages_into_the_model_store() {
        let h = harness(FakeProvider::default());
        let pdf = build_pdf(&["Warranty terms", "Shipping policy", "Returns"]);

        let job = h
            .service
            .submit("llama2:latest", "C:\\Users\\me\\manual.pdf", &pdf)
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.filename, "manual.pdf");

        let done = wait_for(&h.service, &job).await;
        assert_eq!(done.status, JobStatus::Completed, "{:?}", done.error);
        assert_eq!((done.pages, done.chunks), (3, 3));

        let store = h.stores.open("llama2:latest").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 3);
        let documents = store.list_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].filename, "manual.pdf");
        assert_eq!(*h.provider.embedded.lock().unwrap(), 3);
        assert!(upload_dir_is_empty(&h.paths));
    }

    #[tokio::test]
    async fn same_document_twice_is_skipped() {
        let h = harness(FakeProvider::default());
        let pdf = build_pdf(&["Only page"]);

        let first = h.service.submit("llama2:latest", "a.pdf", &pdf).await.unwrap();
        let second = h.service.submit("llama2:latest", "b.pdf", &pdf).await.unwrap();

        assert_eq!(wait_for(&h.service, &first).await.status, JobStatus::Completed);
        let skipped = wait_for(&h.service, &second).await;
        assert_eq!(skipped.status, JobStatus::Skipped);

        let store = h.stores.open("llama2:latest").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(upload_dir_is_empty(&h.paths));
    }

    #[tokio::test]
    async fn embedding_errors_fail_the_job() {
        let h = harness(FakeProvider {
            fail_embeddings: true,
            ..Default::default()
        });
        let pdf = build_pdf(&["Some text"]);

        let job = h.service.submit("llama2:latest", "x.pdf", &pdf).await.unwrap();
        let failed = wait_for(&h.service, &job).await;

        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.error.unwrap().contains("embedding service down"));
        assert!(failed.finished_at.is_some());
        assert!(upload_dir_is_empty(&h.paths));
    }

    #[tokio::test]
    async fn failed_batch_leaves_no_chunks_behind() {
        let h = harness_with(
            FakeProvider {
                fail_embed_call: Some(2),
                ..Default::default()
            },
            RagConfig {
                embed_batch_size: 1,
                ..rag_config()
            },
        );
        let pdf = build_pdf(&["First page", "Second page", "Third page"]);

        let job = h.service.submit("llama2:latest", "partial.pdf", &pdf).await.unwrap();
        let failed = wait_for(&h.service, &job).await;
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(*h.provider.embed_calls.lock().unwrap(), 2);

        let store = h.stores.open("llama2:latest").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.list_documents().await.unwrap().is_empty());

        // The same file can be retried once the provider recovers.
        let retry = h.service.submit("llama2:latest", "partial.pdf", &pdf).await.unwrap();
        assert_eq!(wait_for(&h.service, &retry).await.status, JobStatus::Completed);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn full_queue_fails_fast() {
        let tmp = tempfile::tempdir().unwrap();
        let upload_dir = tmp.path().to_path_buf();
        let (sender, _receiver) = mpsc::channel(1);
        let service =
            IngestionService::with_sender(sender, JobTracker::new(), catalog(), upload_dir.clone());
        let pdf = build_pdf(&["Queued"]);

        service.submit("llama2:latest", "one.pdf", &pdf).await.unwrap();
        let err = tokio::time::timeout(
            Duration::from_secs(1),
            service.submit("llama2:latest", "two.pdf", &pdf),
        )
        .await
        .expect("submit must not wait for queue space")
        .unwrap_err();

        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
        let jobs = service.tracker().list().await;
        let rejected = jobs.iter().find(|j| j.filename == "two.pdf").unwrap();
        assert_eq!(rejected.status, JobStatus::Failed);
        // Only the queued upload keeps its temp copy.
        assert_eq!(std::fs::read_dir(&upload_dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn rejects_non_pdf_and_unknown_models() {
        let h = harness(FakeProvider::default());

        let err = h
            .service
            .submit("llama2:latest", "notes.txt", b"plain text")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = h
            .service
            .submit("mistral:7b", "a.pdf", &build_pdf(&["x"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        assert!(h.service.tracker().list().await.is_empty());
    }

    #[test]
    fn display_filename_strips_directories() {
        assert_eq!(display_filename("/tmp/report.pdf"), "report.pdf");
        assert_eq!(display_filename("dir\\sub\\cv.pdf"), "cv.pdf");
        assert_eq!(display_filename("   "), FALLBACK_FILENAME);
        assert_eq!(display_filename(""), FALLBACK_FILENAME);
    }
}

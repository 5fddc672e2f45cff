use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Extracting,
    Embedding,
    Completed,
    Skipped,
    Failed,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Skipped | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestJob {
    pub id: Uuid,
    pub model: String,
    pub filename: String,
    pub status: JobStatus,
    pub pages: usize,
    pub chunks: usize,
    pub error: Option<String>,
    pub created_at: String,
    pub finished_at: Option<String>,
}

impl IngestJob {
    pub fn new(model: &str, filename: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            model: model.to_string(),
            filename: filename.to_string(),
            status: JobStatus::Queued,
            pages: 0,
            chunks: 0,
            error: None,
            created_at: Utc::now().to_rfc3339(),
            finished_at: None,
        }
    }
}

/// In-memory job table shared by the upload handlers and the worker.
#[derive(Clone, Default)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<Uuid, IngestJob>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: IngestJob) {
        self.jobs.write().await.insert(job.id, job);
    }

    pub async fn get(&self, id: Uuid) -> Option<IngestJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// All jobs, newest first.
    pub async fn list(&self) -> Vec<IngestJob> {
        let mut jobs: Vec<IngestJob> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub async fn set_status(&self, id: Uuid, status: JobStatus) {
        self.update(id, |job| job.status = status).await;
    }

    pub async fn complete(&self, id: Uuid, pages: usize, chunks: usize) {
        self.update(id, |job| {
            job.status = JobStatus::Completed;
            job.pages = pages;
            job.chunks = chunks;
        })
        .await;
    }

    pub async fn skip(&self, id: Uuid, reason: &str) {
        self.update(id, |job| {
            job.status = JobStatus::Skipped;
            job.error = Some(reason.to_string());
        })
        .await;
    }

    pub async fn fail(&self, id: Uuid, error: &str) {
        self.update(id, |job| {
            job.status = JobStatus::Failed;
            job.error = Some(error.to_string());
        })
        .await;
    }

    /// Counts per status, for the status endpoint.
    pub async fn summary(&self) -> HashMap<JobStatus, usize> {
        let mut counts = HashMap::new();
        for job in self.jobs.read().await.values() {
            *counts.entry(job.status).or_insert(0) += 1;
        }
        counts
    }

    async fn update<F>(&self, id: Uuid, apply: F)
    where
        F: FnOnce(&mut IngestJob),
    {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            tracing::warn!("Update for unknown ingestion job {}", id);
            return;
        };
        apply(job);
        if job.status.is_finished() && job.finished_at.is_none() {
            job.finished_at = Some(Utc::now().to_rfc3339());
        }
    }
}

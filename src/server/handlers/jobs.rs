use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn list_jobs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "jobs": state.jobs.list().await }))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = Uuid::parse_str(&job_id)
        .map_err(|_| ApiError::BadRequest(format!("Invalid job id: {}", job_id)))?;
    let job = state
        .jobs
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {}", job_id)))?;

    Ok(Json(job))
}

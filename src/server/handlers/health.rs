use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let reachable = state.provider.health_check().await.unwrap_or(false);
    let jobs = state.jobs.summary().await;
    let model_count = state.catalog.read().await.entries().len();

    Ok(Json(json!({
        "provider": {
            "name": state.provider.name(),
            "reachable": reachable,
        },
        "models": model_count,
        "jobs": jobs,
    })))
}

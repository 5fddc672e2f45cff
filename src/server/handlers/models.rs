use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::models::refresh_catalog;
use crate::state::AppState;

pub async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let catalog = state.catalog.read().await;
    Json(json!({
        "models": catalog.entries(),
        "default": catalog.names().first().copied(),
    }))
}

pub async fn refresh_models(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.provider.health_check().await? {
        return Err(ApiError::ServiceUnavailable(format!(
            "{} is not reachable",
            state.provider.name()
        )));
    }

    let added = refresh_catalog(&state.catalog, state.provider.as_ref()).await;
    let catalog = state.catalog.read().await;

    Ok(Json(json!({
        "added": added,
        "models": catalog.entries(),
    })))
}

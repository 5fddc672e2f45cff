use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::i18n::UiLanguage;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DocumentsQuery {
    pub model: String,
}

/// Accepts a multipart upload with `model`, `file` and an optional `language`.
///
/// Extraction runs in the background; the response carries the queued job.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut model: Option<String> = None;
    let mut language: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "model" => model = Some(read_text(field).await?),
            "language" => language = Some(read_text(field).await?),
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
                file = Some((filename, data.to_vec()));
            }
            other => tracing::debug!("Ignoring multipart field {}", other),
        }
    }

    let model = model
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing 'model' field".to_string()))?;
    let (filename, data) =
        file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;

    let job = state.ingestion.submit(&model, &filename, &data).await?;
    tracing::info!("Queued {} ({} bytes) for model {}", job.filename, data.len(), model);

    let lang = language
        .as_deref()
        .and_then(UiLanguage::parse)
        .unwrap_or_else(|| state.default_language());

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "job": job,
            "message": lang.translations().extraction_started,
        })),
    ))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DocumentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state.catalog.read().await.require(&query.model)?;
    let store = state.stores.open(&query.model).await?;

    Ok(Json(json!({
        "model": query.model,
        "documents": store.list_documents().await?,
        "chunks": store.count().await?,
        "embedding_dimension": store.embedding_dimension().await?,
    })))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart field: {}", e)))
}

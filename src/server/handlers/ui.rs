use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::i18n::UiLanguage;
use crate::state::AppState;

pub async fn list_languages(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let languages: Vec<_> = UiLanguage::ALL
        .iter()
        .map(|lang| {
            json!({
                "label": lang.label(),
                "code": lang.code(),
                "rtl": lang.is_rtl(),
            })
        })
        .collect();

    Json(json!({
        "languages": languages,
        "default": state.default_language().label(),
    }))
}

pub async fn get_translations(Path(language): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let lang = UiLanguage::parse(&language)
        .ok_or_else(|| ApiError::BadRequest(format!("Unsupported language: {}", language)))?;

    Ok(Json(json!({
        "language": lang.label(),
        "code": lang.code(),
        "rtl": lang.is_rtl(),
        "translations": lang.translations(),
    })))
}

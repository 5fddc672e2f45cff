use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::core::config::ServerConfig;
use crate::server::handlers::{ask, documents, health, jobs, models, page, ui};
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// This function sets up:
/// - The single page served at `/`
/// - Health and status endpoints
/// - UI language, model, document, job and question endpoints
/// - CORS, request tracing and the upload size limit
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.config.server);
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(page::index))
        .route("/health", get(health::health))
        .route("/api/status", get(health::get_status))
        .route("/api/languages", get(ui::list_languages))
        .route("/api/translations/:language", get(ui::get_translations))
        .route("/api/models", get(models::list_models))
        .route("/api/models/refresh", post(models::refresh_models))
        .route(
            "/api/documents",
            get(documents::list_documents).post(documents::upload_document),
        )
        .route("/api/jobs", get(jobs::list_jobs))
        .route("/api/jobs/:job_id", get(jobs::get_job))
        .route("/api/ask", post(ask::ask))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins = resolve_allowed_origins(server, |origin| HeaderValue::from_str(origin).ok());

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins<T>(server: &ServerConfig, parse: impl Fn(&str) -> Option<T>) -> Vec<T> {
    let configured: Vec<String> = server
        .cors_allowed_origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    let origins = if configured.is_empty() {
        default_local_origins(server.port)
    } else {
        configured
    };

    origins.iter().filter_map(|origin| parse(origin)).collect()
}

fn default_local_origins(port: u16) -> Vec<String> {
    vec![
        format!("http://localhost:{}", port),
        format!("http://127.0.0.1:{}", port),
        "http://localhost".to_string(),
        "http://127.0.0.1".to_string(),
    ]
}

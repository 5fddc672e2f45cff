use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use docqa_backend::core;
use docqa_backend::core::config::AppPaths;
use docqa_backend::server;
use docqa_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    core::logging::init(&paths);
    let state = AppState::initialize_with_paths(paths).await?;

    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("DOCQA_PORT={}", addr.port());
    tracing::info!("Listening on http://{}", addr);
    tracing::info!(
        "Using {} at {}",
        state.provider.name(),
        state.config.ollama.base_url
    );

    let app: Router = server::router::router(state.clone());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

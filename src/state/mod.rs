use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::i18n::UiLanguage;
use crate::ingest::{IngestionService, JobTracker};
use crate::llm::{LlmProvider, OllamaProvider};
use crate::models::{refresh_catalog, ModelCatalog};
use crate::query::QueryService;
use crate::rag::StoreRegistry;

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes and background tasks.
///
/// Contains references to:
/// - Configuration and paths
/// - The LLM provider and the model catalog
/// - Per-model vector stores
/// - The ingestion worker, its job table and the query service
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: AppConfig,
    pub provider: Arc<dyn LlmProvider>,
    pub catalog: Arc<RwLock<ModelCatalog>>,
    pub stores: StoreRegistry,
    pub jobs: JobTracker,
    pub ingestion: IngestionService,
    pub query: QueryService,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Setting up paths and loading configuration
    /// 2. Creating the Ollama provider
    /// 3. Starting the ingestion worker
    /// 4. Refreshing the model catalog from Ollama in the background
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        Self::initialize_with_paths(Arc::new(AppPaths::new())).await
    }

    /// Same as [`AppState::initialize`] with already-resolved paths.
    pub async fn initialize_with_paths(
        paths: Arc<AppPaths>,
    ) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone())
            .load()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let provider: Arc<dyn LlmProvider> = Arc::new(
            OllamaProvider::new(
                config.ollama.base_url.clone(),
                Duration::from_secs(config.ollama.timeout_secs),
            )
                .map_err(|e| InitializationError::Llm(e.into()))?,
        );

        let state = Self::from_parts(paths, config, provider);

        let provider = state.provider.clone();
        let catalog = state.catalog.clone();
        tokio::spawn(async move {
            match provider.health_check().await {
                Ok(true) => {
                    refresh_catalog(&catalog, provider.as_ref()).await;
                }
                Ok(false) | Err(_) => {
                    tracing::warn!(
                        "{} is not reachable; using configured models only",
                        provider.name()
                    );
                }
            }
        });

        Ok(state)
    }

    /// Wires the services together around an already-built provider.
    ///
    /// Must be called inside a Tokio runtime; the ingestion worker is spawned here.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: AppConfig,
        provider: Arc<dyn LlmProvider>,
    ) -> Arc<Self> {
        let catalog = Arc::new(RwLock::new(ModelCatalog::from_config(&config.models)));
        let stores = StoreRegistry::new(paths.clone());
        let jobs = JobTracker::new();
        let default_language =
            UiLanguage::parse(&config.ui.default_language).unwrap_or(UiLanguage::French);

        let ingestion = IngestionService::start(
            provider.clone(),
            stores.clone(),
            catalog.clone(),
            jobs.clone(),
            config.rag.clone(),
            paths.upload_dir.clone(),
        );
        let query = QueryService::new(
            provider.clone(),
            stores.clone(),
            catalog.clone(),
            config.rag.top_k,
            default_language,
        );

        Arc::new(AppState {
            paths,
            config,
            provider,
            catalog,
            stores,
            jobs,
            ingestion,
            query,
        })
    }

    pub fn default_language(&self) -> UiLanguage {
        UiLanguage::parse(&self.config.ui.default_language).unwrap_or(UiLanguage::French)
    }
}

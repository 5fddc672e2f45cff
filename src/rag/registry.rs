use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::sqlite::SqliteRagStore;
use super::store::RagStore;
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;
use crate::models::store_dir_name;

/// Hands out one vector store per model name, opening each at most once.
#[derive(Clone)]
pub struct StoreRegistry {
    paths: Arc<AppPaths>,
    stores: Arc<Mutex<HashMap<String, Arc<dyn RagStore>>>>,
}

impl StoreRegistry {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self {
            paths,
            stores: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn open(&self, model: &str) -> Result<Arc<dyn RagStore>, ApiError> {
        let dir_name = store_dir_name(model);
        let mut stores = self.stores.lock().await;
        if let Some(store) = stores.get(&dir_name) {
            return Ok(store.clone());
        }

        let dir = self.paths.vector_store_dir(&dir_name);
        let existed = dir.exists();
        let store: Arc<dyn RagStore> = Arc::new(SqliteRagStore::open_dir(&dir).await?);
        if existed {
            tracing::info!("Opened vector store for {} at {}", model, dir.display());
        } else {
            tracing::info!("Created vector store for {} at {}", model, dir.display());
        }

        stores.insert(dir_name, store.clone());
        Ok(store)
    }
}

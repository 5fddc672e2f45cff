//! Catalog of models offered in the selector.
//!
//! Each model owns exactly one vector store directory, derived from its name.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::core::config::ModelConfig;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

const STORE_DIR_PREFIX: &str = "vector_db_";
const STORE_DIR_DIGEST_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
    pub name: String,
    /// Embedding size advertised for the model, if known.
    pub dimension: Option<usize>,
    /// Whether the entry came from configuration or from the provider.
    pub source: ModelSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Config,
    Provider,
}

#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    entries: Vec<ModelEntry>,
}

impl ModelCatalog {
    pub fn from_config(models: &[ModelConfig]) -> Self {
        let mut catalog = Self::default();
        for model in models {
            let name = model.name.trim();
            if name.is_empty() || catalog.contains(name) {
                continue;
            }
            catalog.entries.push(ModelEntry {
                name: name.to_string(),
                dimension: model.dimension,
                source: ModelSource::Config,
            });
        }
        catalog
    }

    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ModelEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn require(&self, name: &str) -> Result<&ModelEntry, ApiError> {
        self.get(name)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown model: {}", name)))
    }

    /// Adds provider models that are not in the catalog yet. Returns how many were added.
    pub fn merge_provider_models<'a, I>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut added = 0;
        for name in names {
            let name = name.trim();
            if name.is_empty() || self.contains(name) {
                continue;
            }
            self.entries.push(ModelEntry {
                name: name.to_string(),
                dimension: None,
                source: ModelSource::Provider,
            });
            added += 1;
        }
        added
    }
}

/// Queries the provider for installed models and merges them into `catalog`.
///
/// The catalog lock is taken only for the merge, so readers are not held up by
/// the provider call. An unreachable provider leaves the catalog as it was.
pub async fn refresh_catalog(catalog: &RwLock<ModelCatalog>, provider: &dyn LlmProvider) -> usize {
    let models = match provider.list_models().await {
        Ok(models) => models,
        Err(e) => {
            tracing::warn!("Failed to refresh models from {}: {}", provider.name(), e);
            return 0;
        }
    };

    let mut catalog = catalog.write().await;
    let added = catalog.merge_provider_models(models.iter().map(|m| m.name.as_str()));
    tracing::info!(
        "Model catalog refreshed from {}: {} new, {} total",
        provider.name(),
        added,
        catalog.entries.len()
    );
    added
}

/// Directory name of the vector store for `model`.
///
/// Characters that cannot appear in a directory name become `_`. When that
/// rewrites the name, a short digest of the original is appended so that
/// `a:b`, `a/b` and `a_b` keep separate stores.
pub fn store_dir_name(model: &str) -> String {
    let model = model.trim();
    let sanitized: String = model
        .chars()
        .map(|c| match c {
            ':' | '/' | '\\' => '_',
            other => other,
        })
        .collect();

    if sanitized == model {
        return format!("{}{}", STORE_DIR_PREFIX, sanitized);
    }

    let digest = hex::encode(Sha256::digest(model.as_bytes()));
    format!(
        "{}{}_{}",
        STORE_DIR_PREFIX,
        sanitized,
        &digest[..STORE_DIR_DIGEST_LEN]
    )
}

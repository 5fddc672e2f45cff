use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::defaults::default_config;
use super::paths::AppPaths;
use super::schema::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
    override_path: Option<PathBuf>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self {
            paths,
            override_path: None,
        }
    }

    /// Reads configuration from `path` instead of the discovered location.
    pub fn with_path(paths: Arc<AppPaths>, path: PathBuf) -> Self {
        Self {
            paths,
            override_path: Some(path),
        }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.override_path {
            return path.clone();
        }

        if let Ok(path) = env::var("DOCQA_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Raw configuration: the YAML file deep-merged over built-in defaults.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let file_config = load_yaml_file(&self.config_path());
        let merged = deep_merge(&default_config(), &file_config);
        validate_config(&merged)?;
        Ok(merged)
    }

    pub fn load(&self) -> Result<AppConfig, ApiError> {
        let raw = self.load_config()?;
        let mut config: AppConfig = serde_json::from_value(raw)
            .map_err(|e| ApiError::BadRequest(format!("Invalid config: {}", e)))?;

        apply_port_override(&mut config, env::var("PORT").ok().as_deref());
        config.ollama.base_url = config.ollama.base_url.trim_end_matches('/').to_string();

        Ok(config)
    }
}

/// `PORT` wins over the file; values that are not a valid port are ignored.
fn apply_port_override(config: &mut AppConfig, value: Option<&str>) {
    let Some(raw) = value else {
        return;
    };
    match raw.trim().parse::<u16>() {
        Ok(port) if port != 0 => config.server.port = port,
        _ => tracing::warn!("Ignoring invalid PORT value {:?}", raw),
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(e) => {
                tracing::warn!("Ignoring unparsable config {}: {}", path.display(), e);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

pub mod defaults;
pub mod paths;
pub mod schema;
pub mod service;
pub mod validation;

pub use paths::AppPaths;
pub use schema::{AppConfig, ModelConfig, OllamaConfig, RagConfig, ServerConfig, UiConfig};
pub use service::ConfigService;

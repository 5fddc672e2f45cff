use async_trait::async_trait;

use super::types::{ChatRequest, ProviderModel};
use crate::core::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name (e.g. "ollama")
    fn name(&self) -> &str;

    /// check if the provider is reachable
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// list models installed on the provider
    async fn list_models(&self) -> Result<Vec<ProviderModel>, ApiError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model: &str) -> Result<String, ApiError>;

    /// raw prompt completion, no template or context
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, ApiError>;

    /// one embedding per input, in input order
    async fn embed(&self, inputs: &[String], model: &str) -> Result<Vec<Vec<f32>>, ApiError>;
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{ChatRequest, ProviderModel};
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(5)
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json(&self, path: &str, body: &Value, what: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("Ollama {} request failed: {}", what, e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Ollama {} error: HTTP {} {}",
                what, status, text
            )));
        }

        res.json().await.map_err(|e| {
            ApiError::Upstream(format!("Ollama {} returned invalid JSON: {}", what, e))
        })
    }
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
    #[serde(default)]
    size: u64,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, ApiError> {
        let url = format!("{}/api/tags", self.base_url);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("Ollama tags request failed: {}", e)))?;

        if !res.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "Failed to list Ollama models: {}",
                res.status()
            )));
        }

        let tags: TagsResponse = res.json().await.map_err(ApiError::upstream)?;
        Ok(tags
            .models
            .into_iter()
            .map(|m| ProviderModel {
                name: m.name,
                size: m.size,
            })
            .collect())
    }

    async fn chat(&self, request: ChatRequest, model: &str) -> Result<String, ApiError> {
        let mut body = json!({
            "model": model,
            "messages": request.messages,
            "stream": false,
        });
        let options = request.options();
        if !options.is_empty() {
            body["options"] = Value::Object(options);
        }

        let payload = self.post_json("/api/chat", &body, "chat").await?;
        Ok(payload["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String, ApiError> {
        let body = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });

        let payload = self.post_json("/api/generate", &body, "generate").await?;
        Ok(payload["response"].as_str().unwrap_or_default().to_string())
    }

    async fn embed(&self, inputs: &[String], model: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": model,
            "input": inputs,
        });

        let payload = self.post_json("/api/embed", &body, "embed").await?;
        let response: EmbedResponse =
            serde_json::from_value(payload).map_err(ApiError::upstream)?;

        if response.embeddings.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "Ollama returned {} embeddings for {} inputs",
                response.embeddings.len(),
                inputs.len()
            )));
        }

        Ok(response.embeddings)
    }
}

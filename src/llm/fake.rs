//! In-process provider used by unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest, ProviderModel};
use crate::core::errors::ApiError;

pub(crate) const FAKE_DIMENSION: usize = 16;

/// Bag-of-words hashing embedding: texts sharing words point the same way.
pub(crate) fn hash_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; FAKE_DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
            % FAKE_DIMENSION;
        vector[bucket] += 1.0;
    }
    vector
}

#[derive(Default)]
pub(crate) struct FakeProvider {
    /// Fixed chat reply; `None` echoes the system prompt.
    pub chat_reply: Option<String>,
    pub fail_embeddings: bool,
    /// Fails only the n-th embed call (1-based).
    pub fail_embed_call: Option<usize>,
    pub models: Vec<String>,
    pub list_delay: Option<Duration>,
    pub chats: Mutex<Vec<Vec<ChatMessage>>>,
    pub generations: Mutex<Vec<String>>,
    pub embedded: Mutex<usize>,
    pub embed_calls: Mutex<usize>,
}

impl FakeProvider {
    pub fn with_reply(reply: &str) -> Self {
        Self {
            chat_reply: Some(reply.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, ApiError> {
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .models
            .iter()
            .map(|name| ProviderModel {
                name: name.clone(),
                size: 0,
            })
            .collect())
    }

    async fn chat(&self, request: ChatRequest, _model: &str) -> Result<String, ApiError> {
        let reply = match &self.chat_reply {
            Some(reply) => reply.clone(),
            None => request
                .messages
                .first()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
        };
        self.chats.lock().unwrap().push(request.messages);
        Ok(reply)
    }

    async fn generate(&self, prompt: &str, _model: &str) -> Result<String, ApiError> {
        self.generations.lock().unwrap().push(prompt.to_string());
        Ok(format!("generated: {}", prompt))
    }

    async fn embed(&self, inputs: &[String], _model: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        let call = {
            let mut calls = self.embed_calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if self.fail_embeddings || self.fail_embed_call == Some(call) {
            return Err(ApiError::Upstream("embedding service down".to_string()));
        }
        *self.embedded.lock().unwrap() += inputs.len();
        Ok(inputs.iter().map(|i| hash_embedding(i)).collect())
    }
}

use std::sync::Arc;

use serde::Serialize;

use super::prompt;
use super::store::{ChunkSearchResult, RagStore};
use crate::core::errors::ApiError;
use crate::llm::{ChatRequest, LlmProvider};

/// Output of one retrieval chain run.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalOutput {
    pub input: String,
    pub context: Vec<ChunkSearchResult>,
    pub answer: String,
}

/// Embeds the question, retrieves the closest chunks and asks the model to
/// answer from them.
pub struct RetrievalChain {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn RagStore>,
    model: String,
    top_k: usize,
}

impl RetrievalChain {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn RagStore>,
        model: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            provider,
            store,
            model: model.into(),
            top_k: top_k.max(1),
        }
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<ChunkSearchResult>, ApiError> {
        if self.store.count().await? == 0 {
            return Ok(Vec::new());
        }

        let mut embeddings = self
            .provider
            .embed(&[question.to_string()], &self.model)
            .await?;
        let query = embeddings
            .pop()
            .ok_or_else(|| ApiError::Upstream("No embedding returned for question".to_string()))?;

        self.store.search(&query, self.top_k).await
    }

    pub async fn invoke(&self, question: &str) -> Result<RetrievalOutput, ApiError> {
        let context = self.retrieve(question).await?;
        tracing::debug!(
            "Retrieved {} chunk(s) for question with model {}",
            context.len(),
            self.model
        );

        let messages = prompt::build_messages(&prompt::format_context(&context), question);
        let answer = self
            .provider
            .chat(ChatRequest::new(messages), &self.model)
            .await?;

        Ok(RetrievalOutput {
            input: question.to_string(),
            context,
            answer,
        })
    }
}

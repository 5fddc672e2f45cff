//! Question answering over a model's vector store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::errors::ApiError;
use crate::i18n::UiLanguage;
use crate::lang::{answer_label, detect_language};
use crate::llm::LlmProvider;
use crate::models::ModelCatalog;
use crate::rag::{ChunkSearchResult, RetrievalChain, StoreRegistry};

#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    /// UI language label or code; the configured default when absent.
    #[serde(default)]
    pub language: Option<String>,
    pub model: String,
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Documents,
    Llm,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub source: String,
    pub page: u32,
    pub score: f32,
}

impl From<&ChunkSearchResult> for SourceRef {
    fn from(result: &ChunkSearchResult) -> Self {
        Self {
            source: result.chunk.source.clone(),
            page: result.chunk.page,
            score: result.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AskResponse {
    /// No question yet; the page shows the prompt text instead.
    Placeholder { message: String },
    Answer {
        source: AnswerSource,
        label: String,
        answer: String,
        detected_language: String,
        sources: Vec<SourceRef>,
    },
}

#[derive(Clone)]
pub struct QueryService {
    provider: Arc<dyn LlmProvider>,
    stores: StoreRegistry,
    catalog: Arc<RwLock<ModelCatalog>>,
    top_k: usize,
    default_language: UiLanguage,
}

impl QueryService {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        stores: StoreRegistry,
        catalog: Arc<RwLock<ModelCatalog>>,
        top_k: usize,
        default_language: UiLanguage,
    ) -> Self {
        Self {
            provider,
            stores,
            catalog,
            top_k,
            default_language,
        }
    }

    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse, ApiError> {
        let language = request
            .language
            .as_deref()
            .and_then(UiLanguage::parse)
            .unwrap_or(self.default_language);
        let texts = language.translations();

        let question = request.question.trim();
        if question.is_empty() {
            return Ok(AskResponse::Placeholder {
                message: texts.question_placeholder.to_string(),
            });
        }

        self.catalog.read().await.require(&request.model)?;
        let store = self.stores.open(&request.model).await?;
        let chain = RetrievalChain::new(
            self.provider.clone(),
            store,
            request.model.as_str(),
            self.top_k,
        );

        let output = chain.invoke(question).await?;
        let detected = detect_language(question);

        if output.answer.trim().is_empty() {
            tracing::info!(
                "Retrieval chain returned no answer for model {}, asking the LLM directly",
                request.model
            );
            let answer = self.provider.generate(question, &request.model).await?;
            return Ok(AskResponse::Answer {
                source: AnswerSource::Llm,
                label: texts.llm_answer_label.to_string(),
                answer,
                detected_language: detected.code().to_string(),
                sources: Vec::new(),
            });
        }

        Ok(AskResponse::Answer {
            source: AnswerSource::Documents,
            label: answer_label(detected).to_string(),
            answer: output.answer,
            detected_language: detected.code().to_string(),
            sources: output.context.iter().map(SourceRef::from).collect(),
        })
    }
}

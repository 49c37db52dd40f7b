use async_trait::async_trait;
use serde_json::Value;

use crate::GenAiError;

/// A grounding source attached to a search-augmented answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundingChunk {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundedAnswer {
    pub text: Option<String>,
    pub chunks: Vec<GroundingChunk>,
}

/// The generative service as the rest of the node sees it.
#[async_trait]
pub trait ContentModel: Send + Sync {
    /// Completion constrained to `schema`; returns the raw JSON text.
    async fn structured(&self, prompt: &str, schema: &Value) -> Result<String, GenAiError>;

    /// Completion with web search enabled.
    async fn grounded_search(&self, prompt: &str) -> Result<GroundedAnswer, GenAiError>;
}

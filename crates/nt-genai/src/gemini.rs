//! Reqwest-backed client for the Gemini `generateContent` REST endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::GenAiError;
use crate::model::{ContentModel, GroundedAnswer, GroundingChunk};

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// `timeout` bounds each HTTP exchange; callers add their own deadline on top.
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenAiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, body: Value) -> Result<GenerateResponse, GenAiError> {
        let api_key = self.api_key.as_deref().ok_or(GenAiError::MissingApiKey)?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<GenerateResponse>().await?)
    }
}

fn user_turn(prompt: &str) -> Value {
    json!([{ "role": "user", "parts": [{ "text": prompt }] }])
}

#[async_trait]
impl ContentModel for GeminiClient {
    async fn structured(&self, prompt: &str, schema: &Value) -> Result<String, GenAiError> {
        let body = json!({
            "contents": user_turn(prompt),
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });
        let response = self.generate(body).await?;
        response
            .text()
            .ok_or_else(|| GenAiError::InvalidOutput("model returned no text".to_string()))
    }

    async fn grounded_search(&self, prompt: &str) -> Result<GroundedAnswer, GenAiError> {
        let body = json!({
            "contents": user_turn(prompt),
            "tools": [{ "google_search": {} }],
        });
        let response = self.generate(body).await?;
        Ok(response.into_grounded())
    }
}

// -- Wire format --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<WireChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct WireChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Debug, Default, Deserialize)]
struct WebSource {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    pub(crate) fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }

    pub(crate) fn into_grounded(self) -> GroundedAnswer {
        let text = self.text();
        let chunks = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.grounding_metadata)
            .map(|m| {
                m.grounding_chunks
                    .into_iter()
                    .filter_map(|c| c.web)
                    .map(|w| GroundingChunk {
                        uri: w.uri,
                        title: w.title,
                    })
                    .collect()
            })
            .unwrap_or_default();
        GroundedAnswer { text, chunks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_and_grounding() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Found "}, {"text": "three leads."}]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://a.example", "title": "A"}},
                    {"retrievedContext": {}},
                    {"web": {"uri": "https://b.example"}}
                ]}
            }]
        }"#;
        let response: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text().as_deref(), Some("Found three leads."));

        let grounded = response.into_grounded();
        assert_eq!(grounded.chunks.len(), 2);
        assert_eq!(grounded.chunks[1].title, None);
    }

    #[test]
    fn empty_response_has_no_text() {
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(response.text().is_none());
        assert!(response.into_grounded().chunks.is_empty());
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let client =
            GeminiClient::new(None, DEFAULT_MODEL, DEFAULT_BASE_URL, Duration::from_secs(1))
                .unwrap();
        assert!(!client.is_configured());
        let err = client.grounded_search("anything").await.unwrap_err();
        assert!(matches!(err, GenAiError::MissingApiKey));
    }
}

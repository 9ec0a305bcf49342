use crate::error::ModelError;
use crate::services::traits::LanguageModel;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Google Gemini `generateContent`, used for sommelier commentary.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let api_key = self.api_key.as_deref().ok_or(ModelError::MissingCredentials)?;

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.8,
                top_p: 0.9,
            },
        };

        debug!("Sending commentary request to Gemini model {}", self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API error {}: {}", status, body);
            return Err(ModelError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    const PATH: &str = "/v1beta/models/gemini-test:generateContent";

    fn client(base_url: &str) -> GeminiClient {
        GeminiClient::new(
            base_url,
            Some("key".to_string()),
            "gemini-test",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn joins_candidate_parts() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_header("x-goog-api-key", "key")
            .with_status(200)
            .with_body(
                r#"{"candidates": [{"content": {"parts": [{"text": "A perfect "}, {"text": "match."}]}}]}"#,
            )
            .create_async()
            .await;

        let text = client(&server.url()).complete("prompt").await.unwrap();
        assert_eq!(text, "A perfect match.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unavailable_is_reported_as_overload() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(503)
            .with_body(r#"{"error": {"message": "The model is overloaded."}}"#)
            .create_async()
            .await;

        let err = client(&server.url()).complete("prompt").await.unwrap_err();
        assert!(err.is_overloaded());
    }

    #[tokio::test]
    async fn no_candidates_is_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let err = client(&server.url()).complete("prompt").await.unwrap_err();
        assert_eq!(err, ModelError::EmptyResponse);
    }
}

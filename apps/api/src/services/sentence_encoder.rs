use crate::error::{ApiError, Result};
use crate::services::traits::TextEmbedder;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// HuggingFace Inference API feature extraction.
#[derive(Debug, Clone)]
pub struct SentenceEncoder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct EncodeRequest<'a> {
    inputs: &'a [String],
    options: Options,
}

#[derive(Debug, Serialize)]
struct Options {
    wait_for_model: bool,
    use_cache: bool,
}

#[derive(Debug, Deserialize)]
struct EncodeResponse(Vec<Vec<f32>>);

impl SentenceEncoder {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            ApiError::ExternalServiceError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl TextEmbedder for SentenceEncoder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EncodeRequest {
            inputs: texts,
            options: Options {
                wait_for_model: true,
                use_cache: true,
            },
        };

        debug!("Embedding {} texts with {}", texts.len(), self.model);
        let url = format!("{}/models/{}", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ApiError::ExternalServiceError(format!("HuggingFace API request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("HuggingFace API error: {}", error_text);
            return Err(ApiError::ExternalServiceError(format!(
                "HuggingFace API error: {}",
                error_text
            )));
        }

        let embeddings: EncodeResponse = response.json().await.map_err(|e| {
            ApiError::SerializationError(format!("Failed to parse HuggingFace response: {}", e))
        })?;

        if embeddings.0.len() != texts.len() {
            return Err(ApiError::ExternalServiceError(format!(
                "HuggingFace returned {} embeddings for {} inputs",
                embeddings.0.len(),
                texts.len()
            )));
        }

        Ok(embeddings.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const PATH: &str = "/models/BAAI/bge-small-en-v1.5";

    fn encoder(base_url: &str) -> SentenceEncoder {
        SentenceEncoder::new(
            base_url,
            "hf-key",
            "BAAI/bge-small-en-v1.5",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_encode_batch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_header("authorization", "Bearer hf-key")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "inputs": ["text1", "text2"]
            })))
            .with_status(200)
            .with_body("[[0.1, 0.2], [0.3, 0.4]]")
            .create_async()
            .await;

        let texts = vec!["text1".to_string(), "text2".to_string()];
        let result = encoder(&server.url()).embed_batch(&texts).await.unwrap();

        assert_eq!(result, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_count_mismatch_and_http_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", PATH)
            .match_body(Matcher::PartialJson(serde_json::json!({"inputs": ["a", "b"]})))
            .with_status(200)
            .with_body("[[0.1]]")
            .create_async()
            .await;
        server
            .mock("POST", PATH)
            .match_body(Matcher::PartialJson(serde_json::json!({"inputs": ["c"]})))
            .with_status(503)
            .with_body("loading")
            .create_async()
            .await;

        let enc = encoder(&server.url());
        let mismatch = enc
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(mismatch, ApiError::ExternalServiceError(_)));

        let unavailable = enc.embed_batch(&["c".to_string()]).await.unwrap_err();
        assert!(unavailable.to_string().contains("loading"));
    }
}

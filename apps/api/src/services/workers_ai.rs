use crate::error::ModelError;
use crate::services::traits::LanguageModel;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Cloudflare Workers AI text generation, used for catalog classification.
#[derive(Debug, Clone)]
pub struct WorkersAiClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    account_id: Option<String>,
    model: String,
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<ApiMessage>>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

impl WorkersAiClient {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        account_id: Option<String>,
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
            api_token: api_token.filter(|t| !t.trim().is_empty()),
            account_id: account_id.filter(|a| !a.trim().is_empty()),
            model: model.to_string(),
        })
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.api_token.as_deref()?, self.account_id.as_deref()?))
    }
}

#[async_trait]
impl LanguageModel for WorkersAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let (token, account_id) = self.credentials().ok_or(ModelError::MissingCredentials)?;

        let url = format!(
            "{}/client/v4/accounts/{}/ai/run/{}",
            self.base_url, account_id, self.model
        );
        let request = RunRequest {
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!("Sending classification request to Workers AI model {}", self.model);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Workers AI error {}: {}", status, body);
            return Err(ModelError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: RunEnvelope = response.json().await?;
        reply_text(envelope)
    }
}

/// Unwrap the reply from the shapes Workers AI is known to return.
fn reply_text(envelope: RunEnvelope) -> Result<String, ModelError> {
    if envelope.success != Some(true) {
        if let Some(errors) = &envelope.errors {
            let message = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ModelError::Api(message));
        }
    }

    match envelope.result {
        Some(Value::String(text)) => Ok(text),
        Some(Value::Object(result)) => match result.get("response") {
            Some(Value::String(text)) => Ok(text.clone()),
            Some(Value::Null) => Err(ModelError::EmptyResponse),
            None => Ok(Value::Object(result).to_string()),
            Some(other) => Ok(other.to_string()),
        },
        Some(Value::Null) | None => Err(ModelError::EmptyResponse),
        Some(other) => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::wine_classifier::WineClassifier;
    use mockito::{Matcher, Server};
    use std::sync::Arc;

    const PATH: &str = "/client/v4/accounts/acct/ai/run/@cf/test-model";

    fn client(base_url: &str) -> WorkersAiClient {
        WorkersAiClient::new(
            base_url,
            Some("token".to_string()),
            Some("acct".to_string()),
            "@cf/test-model",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn returns_response_field_text() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_header("authorization", "Bearer token")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "result": {"response": "{\"is_wine\": true}"}}"#)
            .create_async()
            .await;

        let reply = client(&server.url()).complete("hello").await.unwrap();
        assert_eq!(reply, r#"{"is_wine": true}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn object_response_is_stringified() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(r#"{"success": true, "result": {"response": {"is_wine": false}}}"#)
            .create_async()
            .await;

        let reply = client(&server.url()).complete("hello").await.unwrap();
        assert_eq!(reply, r#"{"is_wine":false}"#);
    }

    #[tokio::test]
    async fn error_payload_is_an_api_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(r#"{"success": false, "errors": [{"message": "quota"}, {"message": "retry later"}]}"#)
            .create_async()
            .await;

        let err = client(&server.url()).complete("hello").await.unwrap_err();
        assert_eq!(err, ModelError::Api("quota, retry later".to_string()));
    }

    #[tokio::test]
    async fn http_failure_and_missing_result() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(500)
            .with_body("internal")
            .create_async()
            .await;

        let err = client(&server.url()).complete("hello").await.unwrap_err();
        assert_eq!(
            err,
            ModelError::Http {
                status: 500,
                body: "internal".to_string()
            }
        );

        let empty = reply_text(RunEnvelope {
            success: Some(true),
            result: None,
            errors: None,
        });
        assert_eq!(empty, Err(ModelError::EmptyResponse));
    }

    #[tokio::test]
    async fn null_response_field_is_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(r#"{"success": true, "result": {"response": null}}"#)
            .create_async()
            .await;

        let client = Arc::new(client(&server.url()));
        assert_eq!(client.complete("hello").await, Err(ModelError::EmptyResponse));

        let result = WineClassifier::new(client)
            .classify("Chateau Test 2019", "A lovely red")
            .await;
        assert_eq!(result.alcohol_type(), "empty_response");
    }

    #[tokio::test]
    async fn errors_without_success_flag_or_messages_are_api_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", PATH)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "messages": [{"content": "no flag"}]
            })))
            .with_status(200)
            .with_body(r#"{"errors": [{"message": "quota"}], "result": null}"#)
            .create_async()
            .await;
        server
            .mock("POST", PATH)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "messages": [{"content": "no messages"}]
            })))
            .with_status(200)
            .with_body(r#"{"success": false, "errors": [], "result": null}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        assert_eq!(
            client.complete("no flag").await,
            Err(ModelError::Api("quota".to_string()))
        );
        assert_eq!(
            client.complete("no messages").await,
            Err(ModelError::Api(String::new()))
        );
    }

    #[tokio::test]
    async fn missing_credentials_skip_the_request() {
        let client = WorkersAiClient::new(
            "http://127.0.0.1:9",
            None,
            Some("acct".to_string()),
            "@cf/test-model",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.complete("hello").await,
            Err(ModelError::MissingCredentials)
        );
    }
}

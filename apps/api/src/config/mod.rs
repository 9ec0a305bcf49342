use crate::error::{ApiError, Result};
use serde::Deserialize;
use std::time::Duration;

/// Application configuration, read from `APP_*` environment variables.
///
/// Credentials are optional at load time so that each command only has to
/// provide what it actually talks to; see [`Config::require`].
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    pub database_url: Option<String>,
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    pub pinecone_api_key: Option<String>,
    /// Data-plane host of the index, e.g. `https://wines-abc123.svc.us-east-1.pinecone.io`.
    pub pinecone_index_host: Option<String>,
    pub pinecone_namespace: Option<String>,

    pub huggingface_api_key: Option<String>,
    #[serde(default = "default_huggingface_base_url")]
    pub huggingface_base_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,

    pub cloudflare_api_token: Option<String>,
    pub cloudflare_account_id: Option<String>,
    #[serde(default = "default_cloudflare_base_url")]
    pub cloudflare_base_url: String,
    #[serde(default = "default_classification_model")]
    pub classification_model: String,

    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_commentary_model")]
    pub commentary_model: String,
    #[serde(default = "default_commentary_max_attempts")]
    pub commentary_max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    pub rakuten_application_id: Option<String>,
    #[serde(default = "default_rakuten_base_url")]
    pub rakuten_base_url: String,
    #[serde(default = "default_catalog_page_delay_ms")]
    pub catalog_page_delay_ms: u64,
    #[serde(default = "default_classify_concurrency")]
    pub classify_concurrency: usize,

    #[serde(default = "default_ingest_page_size")]
    pub ingest_page_size: i64,

    #[serde(default = "default_external_timeout_secs")]
    pub external_service_timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_max_connections() -> u32 {
    5
}

fn default_huggingface_base_url() -> String {
    "https://api-inference.huggingface.co".to_string()
}

fn default_embedding_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

fn default_embed_batch_size() -> usize {
    20
}

fn default_cloudflare_base_url() -> String {
    "https://api.cloudflare.com".to_string()
}

fn default_classification_model() -> String {
    "@cf/meta/llama-3.3-70b-instruct-fp8-fast".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_commentary_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_commentary_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_rakuten_base_url() -> String {
    "https://app.rakuten.co.jp".to_string()
}

fn default_catalog_page_delay_ms() -> u64 {
    1000
}

fn default_classify_concurrency() -> usize {
    1
}

fn default_ingest_page_size() -> i64 {
    20
}

fn default_external_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load `.env` (if present) and then the `APP_*` environment.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("APP"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    /// Return a credential or fail with the name of the variable to set.
    pub fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::ConfigError(format!("APP_{} must be set", name.to_uppercase())))
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_service_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn catalog_page_delay(&self) -> Duration {
        Duration::from_millis(self.catalog_page_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_missing_and_blank_values() {
        assert!(Config::require(&None, "gemini_api_key").is_err());
        assert!(Config::require(&Some("   ".to_string()), "gemini_api_key").is_err());

        let present = Some(" key ".to_string());
        assert_eq!(Config::require(&present, "gemini_api_key").unwrap(), "key");

        let err = Config::require(&None, "database_url").unwrap_err();
        assert!(err.to_string().contains("APP_DATABASE_URL"));
    }
}

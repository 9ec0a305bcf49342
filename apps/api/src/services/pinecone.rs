use crate::error::Result as ApiResult;
use crate::models::{EmbeddingVector, IndexMatch};
use crate::services::traits::VectorIndex;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PineconeClient {
    client: Client,
    base_url: String,
    namespace: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<&'a str>,
    pub vector: &'a [f32],
    pub top_k: usize,
    pub include_values: bool,
    pub include_metadata: bool,
}

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub matches: Vec<IndexMatch>,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Serialize)]
pub struct UpsertRequest<'a> {
    pub vectors: &'a [EmbeddingVector],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<&'a str>,
}

impl PineconeClient {
    /// `index_host` is the data-plane host shown in the Pinecone console,
    /// with or without the scheme.
    pub fn new(
        api_key: &str,
        index_host: &str,
        namespace: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key).context("Invalid Pinecone API key")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let host = index_host.trim_end_matches('/');
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Ok(Self {
            client,
            base_url,
            namespace: namespace.filter(|n| !n.is_empty()),
        })
    }

    pub async fn query_vectors(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<QueryResponse> {
        let request = QueryRequest {
            namespace: self.namespace.as_deref(),
            vector,
            top_k,
            include_values: false,
            include_metadata,
        };

        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Pinecone query failed: {}", error_text);
        }

        let query_response = response.json().await?;
        Ok(query_response)
    }

    pub async fn upsert_vectors(&self, vectors: &[EmbeddingVector]) -> Result<()> {
        let request = UpsertRequest {
            vectors,
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/vectors/upsert", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Pinecone upsert failed: {}", error_text);
        }

        Ok(())
    }
}

#[async_trait]
impl VectorIndex for PineconeClient {
    async fn upsert(&self, vectors: &[EmbeddingVector]) -> ApiResult<()> {
        if vectors.is_empty() {
            return Ok(());
        }
        debug!("Upserting {} vectors to Pinecone", vectors.len());
        Ok(self.upsert_vectors(vectors).await?)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> ApiResult<Vec<IndexMatch>> {
        let response = self.query_vectors(vector, top_k, include_metadata).await?;
        debug!(
            "Pinecone returned {} matches from namespace '{}'",
            response.matches.len(),
            response.namespace
        );
        Ok(response.matches)
    }
}

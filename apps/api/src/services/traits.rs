//! Seams to the external collaborators.
//!
//! Every service holds its collaborators as `Arc<dyn Trait>` so the HTTP
//! clients in this module's siblings and the in-memory implementations in
//! [`memory`](super::memory) are interchangeable.

use crate::error::{ModelError, Result};
use crate::models::{CatalogItem, EmbeddingVector, IndexMatch, NewWine, WineRecord};
use async_trait::async_trait;

/// Single-turn text completion.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, ModelError>;
}

/// Batch text embedding. Returns one vector per input, in input order.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Nearest-neighbour index keyed by string ids. Upserts overwrite by id.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, vectors: &[EmbeddingVector]) -> Result<()>;

    /// Ranked best-first. Ids are not guaranteed to be unique.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<IndexMatch>>;
}

/// Durable table of validated wine rows.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a row and return the id assigned to it.
    async fn insert(&self, wine: &NewWine) -> Result<i64>;

    /// Every row, ordered by id.
    async fn all_wines(&self) -> Result<Vec<WineRecord>>;

    /// Rows for the given ids, in no particular order. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<WineRecord>>;
}

/// Third-party product search, one page at a time.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Pages are 1-based. An empty vector means there are no more results.
    async fn fetch_page(&self, query: &CatalogQuery, page: u32) -> Result<Vec<CatalogItem>>;
}

/// What to ask the catalog source for.
#[derive(Debug, Clone)]
pub struct CatalogQuery {
    pub keyword: String,
    pub genre_id: Option<String>,
    pub hits_per_page: u32,
}

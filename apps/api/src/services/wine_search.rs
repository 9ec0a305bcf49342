use crate::error::{ApiError, Result};
use crate::models::WineRecord;
use crate::services::traits::{CatalogStore, TextEmbedder, VectorIndex};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolves a free-text query to catalog rows through the vector index.
#[derive(Clone)]
pub struct WineSearch {
    embedder: Arc<dyn TextEmbedder>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn CatalogStore>,
}

impl WineSearch {
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
        }
    }

    /// Up to `limit` rows, best match first, without duplicates. Index ids
    /// whose row no longer exists are dropped.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<WineRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidInput("Query cannot be empty".to_string()));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let embedding = self
            .embedder
            .embed_batch(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::ExternalServiceError("no embedding for query".to_string()))?;

        let matches = self.index.query(&embedding, limit, true).await?;
        debug!("Vector index returned {} matches", matches.len());

        let ids = ranked_unique_ids(matches.iter().map(|m| m.id.as_str()));
        if ids.is_empty() {
            info!("No neighbours found for query");
            return Ok(Vec::new());
        }

        let mut rows: HashMap<i64, WineRecord> = self
            .store
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|w| (w.id, w))
            .collect();

        let resolved: Vec<WineRecord> = ids.iter().filter_map(|id| rows.remove(id)).collect();
        if resolved.len() < ids.len() {
            warn!(
                "{} indexed ids have no catalog row",
                ids.len() - resolved.len()
            );
        }
        Ok(resolved)
    }
}

/// Parse index ids as row ids, keeping the first occurrence of each.
fn ranked_unique_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.filter_map(|id| match id.parse::<i64>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(id, "ignoring non-numeric vector id");
            None
        }
    })
    .filter(|id| seen.insert(*id))
    .collect()
}

//! In-process catalog store and vector index.
//!
//! Used by tests and by offline runs where no database or Pinecone project is
//! configured. Both are safe to share across tasks.

use crate::error::Result;
use crate::models::{EmbeddingVector, IndexMatch, NewWine, WineRecord};
use crate::services::traits::{CatalogStore, VectorIndex};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Calculate cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Rows kept in id order; ids start at 1.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    rows: RwLock<Vec<WineRecord>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with rows that already carry ids.
    pub fn with_rows(mut rows: Vec<WineRecord>) -> Self {
        rows.sort_by_key(|r| r.id);
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub async fn remove(&self, id: i64) {
        self.rows.write().await.retain(|r| r.id != id);
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert(&self, wine: &NewWine) -> Result<i64> {
        let mut rows = self.rows.write().await;
        let id = rows.last().map(|r| r.id + 1).unwrap_or(1);
        rows.push(wine.clone().with_id(id));
        Ok(id)
    }

    async fn all_wines(&self) -> Result<Vec<WineRecord>> {
        Ok(self.rows.read().await.clone())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<WineRecord>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|r| ids.contains(&r.id)).cloned().collect())
    }
}

/// Brute-force cosine index. Upserts overwrite by id.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    vectors: RwLock<HashMap<String, EmbeddingVector>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.vectors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.vectors.read().await.is_empty()
    }

    /// All stored vectors, sorted by id.
    pub async fn snapshot(&self) -> Vec<EmbeddingVector> {
        let mut vectors: Vec<_> = self.vectors.read().await.values().cloned().collect();
        vectors.sort_by(|a, b| a.id.cmp(&b.id));
        vectors
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, vectors: &[EmbeddingVector]) -> Result<()> {
        let mut stored = self.vectors.write().await;
        for vector in vectors {
            stored.insert(vector.id.clone(), vector.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<IndexMatch>> {
        let stored = self.vectors.read().await;
        let mut scored: Vec<(&EmbeddingVector, f32)> = stored
            .values()
            .map(|v| (v, cosine_similarity(vector, &v.values)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(v, score)| IndexMatch {
                id: v.id.clone(),
                score,
                metadata: if include_metadata {
                    serde_json::to_value(&v.metadata).ok()
                } else {
                    None
                },
            })
            .collect())
    }
}

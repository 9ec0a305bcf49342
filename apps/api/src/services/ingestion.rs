use crate::error::{ApiError, Result};
use crate::models::{BatchReport, EmbeddingVector, IngestionCursor, VectorMetadata, WineRecord};
use crate::services::traits::{CatalogStore, TextEmbedder, VectorIndex};
use std::sync::Arc;
use tracing::{debug, info};

/// Embeds one slice of the catalog per invocation and upserts it into the
/// vector index, handing back the cursor for the next slice.
///
/// Stateless between invocations: the caller keeps the cursor. Re-running a
/// slice overwrites the same vector ids, so retries are safe.
#[derive(Clone)]
pub struct IngestionBatcher {
    store: Arc<dyn CatalogStore>,
    embedder: Arc<dyn TextEmbedder>,
    index: Arc<dyn VectorIndex>,
    embed_batch_size: usize,
}

impl IngestionBatcher {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        embedder: Arc<dyn TextEmbedder>,
        index: Arc<dyn VectorIndex>,
        embed_batch_size: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            embed_batch_size: embed_batch_size.max(1),
        }
    }

    pub async fn run(&self, cursor: IngestionCursor) -> Result<BatchReport> {
        if cursor.page_size <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "page_size must be positive, got {}",
                cursor.page_size
            )));
        }
        let offset = cursor.offset.max(0) as usize;
        let page_size = cursor.page_size as usize;

        let rows = self.store.all_wines().await?;
        let total_rows = rows.len();
        let slice = rows
            .get(offset..total_rows.min(offset.saturating_add(page_size)))
            .unwrap_or_default();

        if slice.is_empty() {
            info!(offset, total_rows, "nothing left to ingest");
            return Ok(BatchReport {
                offset,
                processed: 0,
                total_rows,
                next_cursor: None,
            });
        }

        let vectors = self.embed_rows(slice).await?;
        self.index.upsert(&vectors).await?;

        let next_offset = offset + slice.len();
        let next_cursor = (next_offset < total_rows)
            .then(|| IngestionCursor::new(next_offset as i64, cursor.page_size));

        info!(
            offset,
            processed = slice.len(),
            total_rows,
            "ingested catalog slice"
        );
        Ok(BatchReport {
            offset,
            processed: slice.len(),
            total_rows,
            next_cursor,
        })
    }

    async fn embed_rows(&self, rows: &[WineRecord]) -> Result<Vec<EmbeddingVector>> {
        let mut vectors = Vec::with_capacity(rows.len());

        for chunk in rows.chunks(self.embed_batch_size) {
            let texts: Vec<String> = chunk.iter().map(embedding_text).collect();
            debug!("Embedding {} rows", texts.len());
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != chunk.len() {
                return Err(ApiError::ExternalServiceError(format!(
                    "embedder returned {} vectors for {} rows",
                    embeddings.len(),
                    chunk.len()
                )));
            }

            vectors.extend(chunk.iter().zip(embeddings).map(|(wine, values)| {
                EmbeddingVector {
                    id: wine.id.to_string(),
                    values,
                    metadata: VectorMetadata::from(wine),
                }
            }));
        }

        Ok(vectors)
    }
}

/// Text that represents a row in the embedding space.
pub fn embedding_text(wine: &WineRecord) -> String {
    [&wine.name, &wine.description, &wine.flavor_profile]
        .into_iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WineType;
    use crate::services::memory::{InMemoryCatalogStore, InMemoryVectorIndex};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic embedding: text length and a constant.
    struct LengthEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextEmbedder for LengthEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| vec![t.chars().count() as f32, 1.0])
                .collect())
        }
    }

    struct FailingIndex;

    #[async_trait]
    impl VectorIndex for FailingIndex {
        async fn upsert(&self, _vectors: &[EmbeddingVector]) -> Result<()> {
            Err(ApiError::ExternalServiceError("index unavailable".to_string()))
        }

        async fn query(
            &self,
            _vector: &[f32],
            _top_k: usize,
            _include_metadata: bool,
        ) -> Result<Vec<crate::models::IndexMatch>> {
            Ok(Vec::new())
        }
    }

    fn wine(id: i64) -> WineRecord {
        WineRecord {
            id,
            name: format!("Wine {}", id),
            wine_type: WineType::Red,
            region: "Mendoza".to_string(),
            flavor_profile: "juicy".to_string(),
            country: "Argentina".to_string(),
            description: format!("Bottle number {}", id),
            image_url: String::new(),
            affiliate_url: String::new(),
            price_range: "1,980円".to_string(),
        }
    }

    fn catalog(rows: i64) -> Arc<InMemoryCatalogStore> {
        Arc::new(InMemoryCatalogStore::with_rows((1..=rows).map(wine).collect()))
    }

    fn batcher(
        store: Arc<InMemoryCatalogStore>,
        index: Arc<dyn VectorIndex>,
    ) -> (IngestionBatcher, Arc<LengthEmbedder>) {
        let embedder = Arc::new(LengthEmbedder {
            calls: AtomicUsize::new(0),
        });
        (IngestionBatcher::new(store, embedder.clone(), index, 4), embedder)
    }

    #[tokio::test]
    async fn walks_the_catalog_page_by_page() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let (batcher, embedder) = batcher(catalog(25), index.clone());

        let first = batcher.run(IngestionCursor::start(10)).await.unwrap();
        assert_eq!(first.processed, 10);
        assert_eq!(first.next_cursor, Some(IngestionCursor::new(10, 10)));
        // Ten rows embedded in chunks of four.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);

        let second = batcher.run(first.next_cursor.unwrap()).await.unwrap();
        assert_eq!(second.processed, 10);

        let third = batcher.run(second.next_cursor.unwrap()).await.unwrap();
        assert_eq!(third.offset, 20);
        assert_eq!(third.processed, 5);
        assert_eq!(third.total_rows, 25);
        assert!(third.is_complete());

        let past_end = batcher.run(IngestionCursor::new(25, 10)).await.unwrap();
        assert_eq!(past_end.processed, 0);
        assert!(past_end.is_complete());

        assert_eq!(index.len().await, 25);
    }

    #[tokio::test]
    async fn rerunning_a_slice_leaves_the_index_unchanged() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let (batcher, _) = batcher(catalog(6), index.clone());

        batcher.run(IngestionCursor::start(6)).await.unwrap();
        let before = index.snapshot().await;
        batcher.run(IngestionCursor::start(6)).await.unwrap();

        assert_eq!(index.snapshot().await, before);
        assert_eq!(before.len(), 6);
        assert_eq!(before[0].id, "1");
        assert_eq!(before[0].metadata.country, "Argentina");
    }

    #[tokio::test]
    async fn upsert_failure_is_reported() {
        let (batcher, _) = batcher(catalog(3), Arc::new(FailingIndex));

        let err = batcher.run(IngestionCursor::start(2)).await.unwrap_err();
        assert!(err.to_string().contains("index unavailable"));
    }

    #[tokio::test]
    async fn cursor_is_normalised() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let (batcher, _) = batcher(catalog(3), index);

        let err = batcher.run(IngestionCursor::new(0, 0)).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let report = batcher.run(IngestionCursor::new(-5, 2)).await.unwrap();
        assert_eq!(report.offset, 0);
        assert_eq!(report.processed, 2);
        assert_eq!(report.next_cursor, Some(IngestionCursor::new(2, 2)));
    }

    #[test]
    fn embedding_text_skips_empty_parts() {
        let mut w = wine(1);
        w.description = "  ".to_string();
        assert_eq!(embedding_text(&w), "Wine 1 juicy");
    }
}

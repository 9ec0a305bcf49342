use crate::{
    app,
    config::Config,
    error::Result,
    models::IngestionCursor,
    services::IngestionBatcher,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};

/// Drive the ingestion cursor from `start` until the catalog is fully
/// indexed, or for at most `max_batches` slices.
pub async fn index_catalog(
    config: &Config,
    start: IngestionCursor,
    max_batches: Option<usize>,
) -> Result<Option<IngestionCursor>> {
    info!("🚀 Starting catalog indexing...");

    let batcher = IngestionBatcher::new(
        app::catalog_store(config).await?,
        app::text_embedder(config)?,
        app::vector_index(config)?,
        config.embed_batch_size,
    );

    run_batches(&batcher, start, max_batches).await
}

/// Returns the cursor to resume from, or `None` once everything is indexed.
pub async fn run_batches(
    batcher: &IngestionBatcher,
    start: IngestionCursor,
    max_batches: Option<usize>,
) -> Result<Option<IngestionCursor>> {
    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows {msg}")
            .progress_chars("#>-"),
    );

    let mut cursor = Some(start);
    let mut batches = 0;

    while let Some(current) = cursor {
        if max_batches.map_or(false, |max| batches >= max) {
            break;
        }

        let report = match batcher.run(current).await {
            Ok(report) => report,
            Err(e) => {
                progress.abandon_with_message("failed");
                error!("❌ Batch at offset {} failed: {}", current.offset, e);
                error!(
                    "↩️  Resume with --offset {} --page-size {}",
                    current.offset, current.page_size
                );
                return Err(e);
            }
        };

        progress.set_length(report.total_rows as u64);
        progress.set_position((report.offset + report.processed) as u64);
        batches += 1;
        cursor = report.next_cursor;
    }

    match cursor {
        None => {
            progress.finish_with_message("done");
            info!("🎉 Catalog fully indexed in {} batches", batches);
        }
        Some(next) => {
            progress.abandon_with_message("paused");
            info!(
                "⏸️  Stopped after {} batches. Resume with --offset {} --page-size {}",
                batches, next.offset, next.page_size
            );
        }
    }

    Ok(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{WineRecord, WineType};
    use crate::services::{InMemoryCatalogStore, InMemoryVectorIndex, TextEmbedder};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct UnitEmbedder;

    #[async_trait]
    impl TextEmbedder for UnitEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn wine(id: i64) -> WineRecord {
        WineRecord {
            id,
            name: format!("Wine {}", id),
            wine_type: WineType::Rose,
            region: "Provence".to_string(),
            flavor_profile: "dry".to_string(),
            country: "France".to_string(),
            description: String::new(),
            image_url: String::new(),
            affiliate_url: String::new(),
            price_range: "2,000円".to_string(),
        }
    }

    fn batcher(index: Arc<InMemoryVectorIndex>) -> IngestionBatcher {
        let store = Arc::new(InMemoryCatalogStore::with_rows((1..=7).map(wine).collect()));
        IngestionBatcher::new(store, Arc::new(UnitEmbedder), index, 10)
    }

    #[tokio::test]
    async fn runs_until_complete() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let remaining = run_batches(&batcher(index.clone()), IngestionCursor::start(3), None)
            .await
            .unwrap();

        assert_eq!(remaining, None);
        assert_eq!(index.len().await, 7);
    }

    #[tokio::test]
    async fn max_batches_returns_resume_cursor() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let remaining = run_batches(&batcher(index.clone()), IngestionCursor::start(3), Some(2))
            .await
            .unwrap();

        assert_eq!(remaining, Some(IngestionCursor::new(6, 3)));
        assert_eq!(index.len().await, 6);
    }
}

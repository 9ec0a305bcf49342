use crate::{
    app,
    config::Config,
    error::Result,
    services::{CatalogImporter, CatalogQuery, WineClassifier},
};
use log::{info, warn};

/// What the `fetch` command asks the catalog source for.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub keyword: String,
    pub genre_id: Option<String>,
    pub hits_per_page: u32,
    pub pages: u32,
}

pub async fn fetch_catalog(config: &Config, options: &FetchOptions) -> Result<()> {
    info!("🚀 Starting catalog import...");
    info!(
        "🔎 Keyword '{}', genre {}, {} pages x {} items",
        options.keyword,
        options.genre_id.as_deref().unwrap_or("-"),
        options.pages,
        options.hits_per_page
    );

    let source = app::catalog_source(config)?;
    let store = app::catalog_store(config).await?;
    let classifier = WineClassifier::new(app::classification_model(config)?);

    let importer = CatalogImporter::new(source, classifier, store)
        .with_page_delay(config.catalog_page_delay())
        .with_concurrency(config.classify_concurrency);

    let query = CatalogQuery {
        keyword: options.keyword.clone(),
        genre_id: options.genre_id.clone(),
        hits_per_page: options.hits_per_page,
    };
    let summary = importer.run(&query, options.pages).await;

    info!("🎉 Import Complete!");
    info!("================================================");
    info!("   📄 Pages fetched: {}", summary.pages_fetched);
    info!("   📦 Items processed: {}", summary.processed);
    info!("   🚫 Excluded by keyword: {}", summary.filtered);
    for (alcohol_type, count) in &summary.rejected {
        info!("   ❌ Rejected ({}): {}", alcohol_type, count);
    }
    info!("   🍷 Wines stored: {}", summary.accepted);
    info!("================================================");

    if summary.store_failures > 0 {
        warn!(
            "⚠️  {} wines could not be stored. Check the database connection and re-run.",
            summary.store_failures
        );
    }

    Ok(())
}

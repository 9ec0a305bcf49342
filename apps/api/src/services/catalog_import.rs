use crate::models::{CatalogItem, ClassificationResult, ClassificationSummary, NewWine};
use crate::services::catalog_filter;
use crate::services::traits::{CatalogQuery, CatalogSource, CatalogStore};
use crate::services::wine_classifier::WineClassifier;
use futures::{stream, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Counts from one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub pages_fetched: u32,
    pub processed: usize,
    /// Dropped by the keyword filter before reaching the model.
    pub filtered: usize,
    /// Rejected or unclassifiable, keyed by alcohol type or diagnostic code.
    pub rejected: BTreeMap<String, usize>,
    pub accepted: usize,
    pub store_failures: usize,
}

impl ImportSummary {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

enum ItemOutcome {
    Filtered,
    Classified(ClassificationResult),
}

/// Pages through a catalog source and stores every item the filter and the
/// classifier both accept.
pub struct CatalogImporter {
    source: Arc<dyn CatalogSource>,
    classifier: WineClassifier,
    store: Arc<dyn CatalogStore>,
    page_delay: Duration,
    concurrency: usize,
}

impl CatalogImporter {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        classifier: WineClassifier,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            source,
            classifier,
            store,
            page_delay: Duration::from_secs(1),
            concurrency: 1,
        }
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Classification calls in flight per page. Store order is unaffected.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Import up to `pages` pages. Stops early at the first empty page or
    /// failed fetch; whatever was stored before that stays stored.
    pub async fn run(&self, query: &CatalogQuery, pages: u32) -> ImportSummary {
        let mut summary = ImportSummary::default();

        for page in 1..=pages {
            let items = match self.source.fetch_page(query, page).await {
                Ok(items) => items,
                Err(e) => {
                    error!(page, error = %e, "catalog page fetch failed, stopping import");
                    break;
                }
            };

            if items.is_empty() {
                info!(page, "catalog page is empty, stopping import");
                break;
            }

            summary.pages_fetched += 1;
            info!(page, items = items.len(), "fetched catalog page");
            self.import_page(&items, &mut summary).await;

            if page < pages {
                sleep(self.page_delay).await;
            }
        }

        info!(
            processed = summary.processed,
            filtered = summary.filtered,
            rejected = summary.rejected_total(),
            accepted = summary.accepted,
            store_failures = summary.store_failures,
            "catalog import finished"
        );
        summary
    }

    async fn import_page(&self, items: &[CatalogItem], summary: &mut ImportSummary) {
        let outcomes: Vec<ItemOutcome> = stream::iter(items)
            .map(|item| self.screen(item))
            .buffered(self.concurrency)
            .collect()
            .await;

        for (item, outcome) in items.iter().zip(outcomes) {
            summary.processed += 1;

            let result = match outcome {
                ItemOutcome::Filtered => {
                    summary.filtered += 1;
                    continue;
                }
                ItemOutcome::Classified(result) => result,
            };

            if let Ok(verdict) = serde_json::to_string(&ClassificationSummary::from(&result)) {
                debug!(item = %item.name, %verdict, "classified");
            }

            let attributes = match result {
                ClassificationResult::Wine { attributes, .. } => attributes,
                other => {
                    info!(item = %item.name, alcohol_type = other.alcohol_type(), "rejected by classifier");
                    *summary
                        .rejected
                        .entry(other.alcohol_type().to_string())
                        .or_default() += 1;
                    continue;
                }
            };

            let wine = NewWine::from_catalog_item(item, attributes);
            match self.store.insert(&wine).await {
                Ok(id) => {
                    summary.accepted += 1;
                    info!(id, name = %wine.name, "stored wine");
                }
                Err(e) => {
                    summary.store_failures += 1;
                    warn!(name = %wine.name, error = %e, "failed to store wine");
                }
            }
        }
    }

    async fn screen(&self, item: &CatalogItem) -> ItemOutcome {
        if let Some(term) = catalog_filter::exclusion_term(&item.name) {
            info!(item = %item.name, term, "excluded by keyword filter");
            return ItemOutcome::Filtered;
        }
        ItemOutcome::Classified(self.classifier.classify(&item.name, &item.caption).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, ModelError, Result};
    use crate::models::WineType;
    use crate::services::memory::InMemoryCatalogStore;
    use crate::services::traits::LanguageModel;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Pages served in order; `None` simulates a failed fetch.
    struct PagedSource {
        pages: Vec<Option<Vec<CatalogItem>>>,
        requested: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl CatalogSource for PagedSource {
        async fn fetch_page(&self, _query: &CatalogQuery, page: u32) -> Result<Vec<CatalogItem>> {
            self.requested.lock().unwrap().push(page);
            match self.pages.get(page as usize - 1) {
                Some(Some(items)) => Ok(items.clone()),
                Some(None) => Err(ApiError::ExternalServiceError("HTTP 500".to_string())),
                None => Ok(Vec::new()),
            }
        }
    }

    /// Answers by keyword in the prompt.
    struct KeywordModel {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for KeywordModel {
        async fn complete(&self, prompt: &str) -> std::result::Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if prompt.contains("Mystery") {
                Err(ModelError::Http {
                    status: 500,
                    body: "boom".to_string(),
                })
            } else if prompt.contains("Umeshu") {
                Ok(r#"{"is_wine": false, "alcohol_type": "liqueur"}"#.to_string())
            } else {
                Ok(r#"{"is_wine": true, "alcohol_type": "wine", "type": "white", "region": "Loire", "flavor_profile": "crisp", "country": "France"}"#.to_string())
            }
        }
    }

    fn item(name: &str) -> CatalogItem {
        CatalogItem {
            name: name.to_string(),
            price: 2980,
            caption: "<b>Fresh</b>\nand dry".to_string(),
            image_urls: vec!["https://img.example/x.jpg".to_string()],
            item_url: format!("https://item.example/{}", name),
        }
    }

    fn query() -> CatalogQuery {
        CatalogQuery {
            keyword: "wine".to_string(),
            genre_id: None,
            hits_per_page: 30,
        }
    }

    fn importer(
        pages: Vec<Option<Vec<CatalogItem>>>,
    ) -> (CatalogImporter, Arc<PagedSource>, Arc<KeywordModel>, Arc<InMemoryCatalogStore>) {
        let source = Arc::new(PagedSource {
            pages,
            requested: Mutex::new(Vec::new()),
        });
        let model = Arc::new(KeywordModel {
            prompts: Mutex::new(Vec::new()),
        });
        let store = Arc::new(InMemoryCatalogStore::new());
        let importer = CatalogImporter::new(
            source.clone(),
            WineClassifier::new(model.clone()),
            store.clone(),
        )
        .with_concurrency(4);
        (importer, source, model, store)
    }

    #[tokio::test(start_paused = true)]
    async fn imports_accepted_wines_in_catalog_order() {
        let (importer, source, model, store) = importer(vec![
            Some(vec![
                item("Sancerre 2021"),
                item("Premium beer 6 pack"),
                item("Umeshu Gold"),
                item("Muscadet 2022"),
            ]),
            Some(vec![item("Mystery Bottle"), item("Vouvray 2020")]),
        ]);
        let started = Instant::now();

        let summary = importer.run(&query(), 5).await;

        assert_eq!(summary.pages_fetched, 2);
        assert_eq!(summary.processed, 6);
        assert_eq!(summary.filtered, 1);
        assert_eq!(summary.accepted, 3);
        assert_eq!(summary.rejected.get("liqueur"), Some(&1));
        assert_eq!(summary.rejected.get("api_error"), Some(&1));
        assert_eq!(summary.store_failures, 0);

        // Page 3 came back empty, so pages 4 and 5 were never requested.
        assert_eq!(*source.requested.lock().unwrap(), vec![1, 2, 3]);
        assert!(started.elapsed() >= Duration::from_secs(2));
        // The filtered item never reached the model.
        assert_eq!(model.prompts.lock().unwrap().len(), 5);

        let stored = store.all_wines().await.unwrap();
        let names: Vec<&str> = stored.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Sancerre 2021", "Muscadet 2022", "Vouvray 2020"]);
        assert_eq!(stored[0].wine_type, WineType::White);
        assert_eq!(stored[0].description, "Fresh and dry");
        assert_eq!(stored[0].price_range, "2,980円");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_page_stops_the_run() {
        let (importer, source, _model, store) =
            importer(vec![Some(vec![item("Sancerre 2021")]), None, Some(vec![item("Vouvray 2020")])]);

        let summary = importer.run(&query(), 3).await;

        assert_eq!(summary.pages_fetched, 1);
        assert_eq!(summary.accepted, 1);
        assert_eq!(*source.requested.lock().unwrap(), vec![1, 2]);
        assert_eq!(store.all_wines().await.unwrap().len(), 1);
    }
}

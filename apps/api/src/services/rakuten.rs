use crate::error::{ApiError, Result};
use crate::models::CatalogItem;
use crate::services::traits::{CatalogQuery, CatalogSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

const ITEM_SEARCH_PATH: &str = "/services/api/IchibaItem/Search/20170706";
const SORT_BY_REVIEW_AVERAGE: &str = "-reviewAverage";

/// Rakuten Ichiba item search.
#[derive(Debug, Clone)]
pub struct RakutenClient {
    client: Client,
    base_url: String,
    application_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Items", default)]
    items: Vec<ItemEnvelope>,
}

#[derive(Debug, Deserialize)]
struct ItemEnvelope {
    #[serde(rename = "Item")]
    item: RakutenItem,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RakutenItem {
    item_name: String,
    #[serde(default)]
    item_price: i64,
    #[serde(default)]
    item_caption: String,
    #[serde(default)]
    medium_image_urls: Vec<ImageUrl>,
    #[serde(default)]
    item_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageUrl {
    image_url: String,
}

impl From<RakutenItem> for CatalogItem {
    fn from(item: RakutenItem) -> Self {
        CatalogItem {
            name: item.item_name,
            price: item.item_price,
            caption: item.item_caption,
            image_urls: item
                .medium_image_urls
                .into_iter()
                .map(|u| u.image_url)
                .collect(),
            item_url: item.item_url,
        }
    }
}

impl RakutenClient {
    pub fn new(base_url: &str, application_id: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            ApiError::ExternalServiceError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            application_id: application_id.to_string(),
        })
    }
}

#[async_trait]
impl CatalogSource for RakutenClient {
    async fn fetch_page(&self, query: &CatalogQuery, page: u32) -> Result<Vec<CatalogItem>> {
        let hits = query.hits_per_page.to_string();
        let page_param = page.to_string();
        let mut params = vec![
            ("applicationId", self.application_id.as_str()),
            ("format", "json"),
            ("keyword", query.keyword.as_str()),
            ("hits", hits.as_str()),
            ("page", page_param.as_str()),
            ("sort", SORT_BY_REVIEW_AVERAGE),
        ];
        if let Some(genre_id) = query.genre_id.as_deref() {
            params.push(("genreId", genre_id));
        }

        debug!("Fetching catalog page {} for '{}'", page, query.keyword);
        let response = self
            .client
            .get(format!("{}{}", self.base_url, ITEM_SEARCH_PATH))
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Rakuten API error {}: {}", status, error_text);
            return Err(ApiError::ExternalServiceError(format!(
                "Rakuten API error {}: {}",
                status, error_text
            )));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            ApiError::SerializationError(format!("Failed to parse Rakuten response: {}", e))
        })?;

        Ok(parsed
            .items
            .into_iter()
            .map(|envelope| envelope.item.into())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn query() -> CatalogQuery {
        CatalogQuery {
            keyword: "ワイン".to_string(),
            genre_id: Some("510915".to_string()),
            hits_per_page: 30,
        }
    }

    #[tokio::test]
    async fn fetches_and_maps_items() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", ITEM_SEARCH_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("applicationId".into(), "app-id".into()),
                Matcher::UrlEncoded("genreId".into(), "510915".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
                Matcher::UrlEncoded("hits".into(), "30".into()),
                Matcher::UrlEncoded("sort".into(), "-reviewAverage".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"Items": [{"Item": {
                    "itemName": "Chateau Test 2019",
                    "itemPrice": 3980,
                    "itemCaption": "Dry red",
                    "mediumImageUrls": [{"imageUrl": "https://img.example/1.jpg"}],
                    "itemUrl": "https://item.example/1"
                }}], "count": 1}"#,
            )
            .create_async()
            .await;

        let client =
            RakutenClient::new(&server.url(), "app-id", Duration::from_secs(5)).unwrap();
        let items = client.fetch_page(&query(), 2).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Chateau Test 2019");
        assert_eq!(items[0].price, 3980);
        assert_eq!(items[0].image_urls, vec!["https://img.example/1.jpg".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_page_and_http_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", ITEM_SEARCH_PATH)
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_body(r#"{"Items": []}"#)
            .create_async()
            .await;
        server
            .mock("GET", ITEM_SEARCH_PATH)
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(429)
            .with_body("too_many_requests")
            .create_async()
            .await;

        let client =
            RakutenClient::new(&server.url(), "app-id", Duration::from_secs(5)).unwrap();
        assert!(client.fetch_page(&query(), 1).await.unwrap().is_empty());
        let err = client.fetch_page(&query(), 2).await.unwrap_err();
        assert!(matches!(err, ApiError::ExternalServiceError(_)));
    }
}

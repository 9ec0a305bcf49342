use crate::error::{ApiError, Result};
use crate::models::{RecommendationRequest, RecommendationResponse, WineType};
use crate::services::commentary::CommentaryGenerator;
use crate::services::wine_search::WineSearch;
use tracing::info;

pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 3;

const FACET_SEPARATOR: &str = "、";

/// Questionnaire in, matched wines and sommelier commentary out.
#[derive(Clone)]
pub struct RecommendationService {
    search: WineSearch,
    commentary: CommentaryGenerator,
}

impl RecommendationService {
    pub fn new(search: WineSearch, commentary: CommentaryGenerator) -> Self {
        Self { search, commentary }
    }

    pub async fn recommend(&self, request: &RecommendationRequest) -> Result<RecommendationResponse> {
        let query = build_search_query(request)?;
        let limit = match request.limit {
            0 => DEFAULT_RECOMMENDATION_LIMIT,
            n => n,
        };
        info!("Searching wines for query: {}", query);

        let wines = self.search.search(&query, limit).await?;
        let commentary = self.commentary.generate(request, &wines).await;

        Ok(RecommendationResponse { wines, commentary })
    }
}

fn type_label(wine_type: WineType) -> &'static str {
    match wine_type {
        WineType::Red => "赤",
        WineType::White => "白",
        WineType::Rose => "ロゼ",
        WineType::Sparkling => "スパークリング",
        WineType::Dessert => "デザート",
    }
}

fn price_label(band: &str) -> Option<&'static str> {
    match band.trim().to_lowercase().as_str() {
        "low" => Some("リーズナブルな価格"),
        "medium" => Some("手頃な価格"),
        "high" => Some("プレミアムな"),
        _ => None,
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Semantic search text for a questionnaire: each answered facet as a short
/// Japanese phrase, joined with `、`, followed by the free text.
pub fn build_search_query(request: &RecommendationRequest) -> Result<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(wine_type) = request.type_preference {
        parts.push(format!("{}ワイン", type_label(wine_type)));
    }
    if let Some(flavor) = present(&request.flavor_trend) {
        parts.push(format!("{}な味わい", flavor));
    }
    if let Some(body) = present(&request.body) {
        parts.push(format!("{}のボディ", body));
    }
    if let Some(region) = present(&request.region) {
        parts.push(format!("{}産", region));
    }
    if let Some(occasion) = present(&request.occasion) {
        parts.push(format!("{}向き", occasion));
    }
    if let Some(price) = present(&request.price_band).and_then(price_label) {
        parts.push(price.to_string());
    }
    if let Some(free_text) = present(&request.user_prompt) {
        parts.push(free_text.to_string());
    }

    if parts.is_empty() {
        return Err(ApiError::InvalidInput(
            "At least one preference or a free-text request is required".to_string(),
        ));
    }
    Ok(parts.join(FACET_SEPARATOR))
}

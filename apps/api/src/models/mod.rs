use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use classification::{ClassificationFailure, ClassificationResult, ClassificationSummary};
pub use ingestion::{BatchReport, EmbeddingVector, IndexMatch, IngestionCursor, VectorMetadata};
pub use wine::{CatalogItem, NewWine, WineAttributes, WineRecord, WineType};

mod classification;
mod ingestion;
pub mod wine;

/// Request structure for semantic wine search
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchRequest {
    /// Free-text description of the wine being looked for
    #[schema(example = "light and fruity red for a weeknight dinner")]
    pub query: String,
    /// Maximum number of wines to return (default: 3)
    #[serde(default = "default_limit")]
    #[schema(example = 3, minimum = 1, maximum = 50)]
    pub limit: usize,
}

/// Questionnaire answers plus free text. Every facet is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RecommendationRequest {
    #[serde(default, alias = "type")]
    pub type_preference: Option<WineType>,
    #[serde(default, alias = "flavor")]
    pub flavor_trend: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub occasion: Option<String>,
    /// One of `low`, `medium`, `high`
    #[serde(default, alias = "price")]
    pub price_band: Option<String>,
    #[serde(default)]
    pub user_prompt: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Response structure for wine recommendations
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecommendationResponse {
    pub wines: Vec<WineRecord>,
    /// Sommelier commentary, never empty
    pub commentary: String,
}

/// Health check response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub timestamp: String,
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Query cannot be empty")]
    pub error: String,
}

fn default_limit() -> usize {
    3
}

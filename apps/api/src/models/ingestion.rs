use super::wine::{WineRecord, WineType};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Next unprocessed slice of the catalog: rows `[offset, offset + page_size)`.
///
/// The core never stores a cursor; whoever drives ingestion keeps it between
/// invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IngestionCursor {
    #[schema(example = 0)]
    pub offset: i64,
    #[schema(example = 20)]
    pub page_size: i64,
}

impl IngestionCursor {
    pub fn new(offset: i64, page_size: i64) -> Self {
        Self { offset, page_size }
    }

    pub fn start(page_size: i64) -> Self {
        Self::new(0, page_size)
    }
}

/// Index-side projection of a row, for debugging and filtering only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub wine_type: WineType,
    pub price_range: String,
    pub country: String,
}

impl From<&WineRecord> for VectorMetadata {
    fn from(wine: &WineRecord) -> Self {
        Self {
            name: wine.name.clone(),
            wine_type: wine.wine_type,
            price_range: wine.price_range.clone(),
            country: wine.country.clone(),
        }
    }
}

/// One vector to upsert, keyed by the stringified row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

/// A neighbour returned by a vector query, best match first.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Result of one batcher invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchReport {
    /// Offset actually used after normalisation.
    pub offset: usize,
    pub processed: usize,
    pub total_rows: usize,
    /// `None` once the catalog has been fully processed.
    pub next_cursor: Option<IngestionCursor>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.next_cursor.is_none()
    }
}

use crate::error::ModelError;
use crate::models::{RecommendationRequest, WineRecord};
use crate::services::retry::{retry_with_backoff, RetryPolicy};
use crate::services::traits::LanguageModel;
use std::sync::Arc;
use tracing::{info, warn};

/// Wines described per commentary.
pub const MAX_FEATURED_WINES: usize = 3;

pub const FALLBACK_COMMENTARY: &str =
    "あなたの好みに寄り添うワインを選びました。どれもぴったりの一本です。";
pub const EMPTY_REPLY_COMMENTARY: &str =
    "あなたにぴったりの一本を見つけました。素敵な時間をお過ごしください。";
pub const NO_MATCH_COMMENTARY: &str =
    "条件に合うワインが見つかりませんでした。条件を変えてもう一度お試しください。";

/// Sommelier-style commentary for a set of matched wines.
///
/// Never fails: overload errors are retried with backoff, everything else
/// (and the last overload) degrades to a static sentence.
#[derive(Clone)]
pub struct CommentaryGenerator {
    model: Arc<dyn LanguageModel>,
    retry: RetryPolicy,
}

impl CommentaryGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }

    pub async fn generate(&self, request: &RecommendationRequest, wines: &[WineRecord]) -> String {
        if wines.is_empty() {
            return NO_MATCH_COMMENTARY.to_string();
        }

        let featured = &wines[..wines.len().min(MAX_FEATURED_WINES)];
        let prompt = build_prompt(request, featured);

        let result = retry_with_backoff(
            self.retry,
            || self.model.complete(&prompt),
            ModelError::is_overloaded,
        )
        .await;

        match result {
            Ok(text) if !text.trim().is_empty() => {
                info!("Generated commentary for {} wines", featured.len());
                text.trim().to_string()
            }
            Ok(_) => EMPTY_REPLY_COMMENTARY.to_string(),
            Err(e) => {
                warn!("Commentary generation failed, using fallback: {}", e);
                FALLBACK_COMMENTARY.to_string()
            }
        }
    }
}

fn build_prompt(request: &RecommendationRequest, wines: &[WineRecord]) -> String {
    let type_preference = request
        .type_preference
        .map(|t| t.as_str().to_string())
        .unwrap_or_else(|| "no preference".to_string());
    let occasion = facet(&request.occasion, "everyday enjoyment");
    let flavor_trend = facet(&request.flavor_trend, "balanced");
    let user_prompt = facet(&request.user_prompt, "none");

    let wine_lines = wines
        .iter()
        .map(|w| format!("- {} ({}): {}", w.name, w.region, w.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a first-class sommelier. Explain, in Japanese, why the wines below were chosen for this guest. Be elegant yet approachable.

Guest preferences:
- Preferred type: {type_preference}
- Occasion: {occasion}
- Flavor trend: {flavor_trend}
- Free text: {user_prompt}

Selected wines:
{wine_lines}

Constraints:
- Around 250 Japanese characters, building anticipation.
- Mention the service name "ぴったりわいん" and stress that the choice fits the guest perfectly.
- Balance friendliness with a sense of luxury."#
    )
}

fn facet<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

use crate::error::ModelError;
use crate::models::wine::{DEFAULT_COUNTRY, DEFAULT_FLAVOR_PROFILE, DEFAULT_REGION};
use crate::models::{ClassificationFailure, ClassificationResult, WineAttributes, WineType};
use crate::services::llm_output::{self, PartialReply};
use crate::services::traits::LanguageModel;
use futures::FutureExt;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

const MAX_CAPTION_CHARS: usize = 300;

lazy_static! {
    /// English and Japanese type tokens, keyed in lower case.
    static ref TYPE_NORMALIZATION: HashMap<&'static str, WineType> = {
        let mut m = HashMap::new();
        m.insert("red", WineType::Red);
        m.insert("white", WineType::White);
        m.insert("rose", WineType::Rose);
        m.insert("rosé", WineType::Rose);
        m.insert("sparkling", WineType::Sparkling);
        m.insert("dessert", WineType::Dessert);
        m.insert("赤", WineType::Red);
        m.insert("白", WineType::White);
        m.insert("ロゼ", WineType::Rose);
        m.insert("スパークリング", WineType::Sparkling);
        m.insert("デザート", WineType::Dessert);
        m
    };
}

/// Asks the model whether a catalog item is a single bottle of wine and, if
/// so, for its attributes.
///
/// [`classify`](WineClassifier::classify) is total: every failure becomes a
/// `Failed` result carrying a diagnostic code.
#[derive(Clone)]
pub struct WineClassifier {
    model: Arc<dyn LanguageModel>,
}

impl WineClassifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn classify(&self, item_name: &str, item_caption: &str) -> ClassificationResult {
        let prompt = build_prompt(item_name, item_caption);

        let reply = match AssertUnwindSafe(self.model.complete(&prompt))
            .catch_unwind()
            .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                let failure = failure_for(&e);
                warn!(item = item_name, error = %e, code = failure.code(), "classification call failed");
                return ClassificationResult::Failed(failure);
            }
            Err(_) => {
                warn!(item = item_name, "classification call panicked");
                return ClassificationResult::Failed(ClassificationFailure::Exception);
            }
        };

        if is_blank_reply(&reply) {
            warn!(item = item_name, "model returned an empty reply");
            return ClassificationResult::Failed(ClassificationFailure::EmptyResponse);
        }

        match llm_output::recover(&reply) {
            Ok(parsed) => interpret(parsed),
            Err(e) => {
                warn!(item = item_name, error = %e, "could not parse classification reply");
                ClassificationResult::Failed(ClassificationFailure::ParseError)
            }
        }
    }
}

fn failure_for(error: &ModelError) -> ClassificationFailure {
    match error {
        ModelError::MissingCredentials => ClassificationFailure::MissingCredentials,
        ModelError::Http { .. } | ModelError::Api(_) => ClassificationFailure::ApiError,
        ModelError::EmptyResponse => ClassificationFailure::EmptyResponse,
        ModelError::Transport(_) | ModelError::Decode(_) => ClassificationFailure::Exception,
    }
}

fn is_blank_reply(reply: &str) -> bool {
    let trimmed = reply.trim();
    trimmed.is_empty() || trimmed == "undefined" || trimmed == "null"
}

/// Turn recovered fields into a verdict, defaulting each attribute on its own.
fn interpret(parsed: PartialReply) -> ClassificationResult {
    let alcohol_type = non_blank(parsed.alcohol_type).unwrap_or_else(|| "unknown".to_string());

    if parsed.is_wine != Some(true) {
        return ClassificationResult::NotWine { alcohol_type };
    }

    let attributes = WineAttributes {
        wine_type: normalize_wine_type(parsed.wine_type.as_deref().unwrap_or_default()),
        region: non_blank(parsed.region).unwrap_or_else(|| DEFAULT_REGION.to_string()),
        flavor_profile: non_blank(parsed.flavor_profile)
            .unwrap_or_else(|| DEFAULT_FLAVOR_PROFILE.to_string()),
        country: non_blank(parsed.country).unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
    };

    ClassificationResult::Wine {
        alcohol_type,
        attributes,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Map a model type token to a canonical type. Unrecognised tokens become Red.
pub fn normalize_wine_type(raw: &str) -> WineType {
    let key = raw.trim().to_lowercase();
    match TYPE_NORMALIZATION.get(key.as_str()) {
        Some(wine_type) => *wine_type,
        None => {
            debug!(token = raw, "unrecognised wine type token, defaulting to Red");
            WineType::Red
        }
    }
}

pub fn build_prompt(item_name: &str, item_caption: &str) -> String {
    let caption: String = item_caption.chars().take(MAX_CAPTION_CHARS).collect();

    format!(
        r#"Analyse the product below and decide strictly whether it is a bottle of wine sold as a beverage.

Decision rules:
- ACCEPT: a single bottle of red, white, rose, sparkling or dessert wine.
- REJECT: beer, whisky and other spirits, sake, liqueur, wine glasses, multi-bottle sets or cases, accessories and goods, snacks, empty bottles.

Reply with a JSON object only. Do NOT wrap the reply in a Markdown code block (```), and add no text before or after it.

Product name: {item_name}
Description: {caption}

Reply in exactly this shape:
{{
  "is_wine": true/false,
  "alcohol_type": "(wine, red wine, white wine, sparkling, beer, sake, ...)",
  "type": "Red|White|Rose|Sparkling|Dessert (required when is_wine is true; 赤|白|ロゼ|スパークリング|デザート also accepted)",
  "region": "specific region (e.g. Bordeaux, Chianti, California)",
  "flavor_profile": "taste characteristics (e.g. full-bodied, dry)",
  "country": "country name (e.g. France, Italy, Japan)"
}}"#
    )
}

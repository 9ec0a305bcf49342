use super::wine::WineAttributes;
use serde::Serialize;

/// Why a classification call could not produce a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationFailure {
    /// Model credentials are not configured.
    MissingCredentials,
    /// HTTP failure or an error payload from the model API.
    ApiError,
    /// Empty, whitespace-only, `null` or `undefined` reply.
    EmptyResponse,
    /// Every recovery strategy failed on the reply.
    ParseError,
    /// Anything else (transport failure, undecodable envelope).
    Exception,
}

impl ClassificationFailure {
    /// Diagnostic code reported in place of an alcohol type.
    pub fn code(&self) -> &'static str {
        match self {
            ClassificationFailure::MissingCredentials => "unknown",
            ClassificationFailure::ApiError => "api_error",
            ClassificationFailure::EmptyResponse => "empty_response",
            ClassificationFailure::ParseError => "parse_error",
            ClassificationFailure::Exception => "exception",
        }
    }
}

/// Outcome of asking the model whether a catalog item is a wine.
///
/// Attributes only exist on the `Wine` variant, so they can never be set for
/// a rejected item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationResult {
    Wine {
        alcohol_type: String,
        attributes: WineAttributes,
    },
    NotWine {
        alcohol_type: String,
    },
    Failed(ClassificationFailure),
}

impl ClassificationResult {
    pub fn is_wine(&self) -> bool {
        matches!(self, ClassificationResult::Wine { .. })
    }

    /// The model's alcohol type, or the diagnostic code on failure.
    pub fn alcohol_type(&self) -> &str {
        match self {
            ClassificationResult::Wine { alcohol_type, .. }
            | ClassificationResult::NotWine { alcohol_type } => alcohol_type,
            ClassificationResult::Failed(failure) => failure.code(),
        }
    }

    pub fn attributes(&self) -> Option<&WineAttributes> {
        match self {
            ClassificationResult::Wine { attributes, .. } => Some(attributes),
            _ => None,
        }
    }
}

/// Flat view used in logs and diagnostics output.
#[derive(Debug, Serialize)]
pub struct ClassificationSummary<'a> {
    pub is_wine: bool,
    pub alcohol_type: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub wine_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor_profile: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<&'a str>,
}

impl<'a> From<&'a ClassificationResult> for ClassificationSummary<'a> {
    fn from(result: &'a ClassificationResult) -> Self {
        let attributes = result.attributes();
        Self {
            is_wine: result.is_wine(),
            alcohol_type: result.alcohol_type(),
            wine_type: attributes.map(|a| a.wine_type.as_str()),
            region: attributes.map(|a| a.region.as_str()),
            flavor_profile: attributes.map(|a| a.flavor_profile.as_str()),
            country: attributes.map(|a| a.country.as_str()),
        }
    }
}

//! Best-effort recovery of a structured classification from a model reply.
//!
//! Replies are supposed to be a bare JSON object but routinely arrive wrapped
//! in prose, with unquoted keys, single quotes, trailing commas, or as plain
//! `key: value` lines. [`recover`] tries a fixed list of strategies in order
//! and returns the first one that yields a record.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

lazy_static! {
    static ref BARE_KEY: Regex =
        Regex::new(r"(^|[,{\n\r\t\s])([a-zA-Z_][a-zA-Z0-9_]*)\s*:").unwrap();
    static ref TRAILING_COMMA: Regex = Regex::new(r",\s*([}\]])").unwrap();
    static ref SINGLE_QUOTED: Regex = Regex::new(r"'([^'\\]*(?:\\.[^'\\]*)*)'").unwrap();
    static ref KEY_VALUE_LINE: Regex = Regex::new(
        r"(?i)^(is_wine|alcohol_type|type|region|flavor_profile|country)\s*[:=]\s*(.+)$"
    )
    .unwrap();
    static ref DOUBLE_QUOTED_VALUE: Regex = Regex::new(r#"^"(.+)"$"#).unwrap();
    static ref SINGLE_QUOTED_VALUE: Regex = Regex::new(r"^'(.+)'$").unwrap();
}

/// Fields recovered from a reply. Anything the model left out stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialReply {
    pub is_wine: Option<bool>,
    pub alcohol_type: Option<String>,
    pub wine_type: Option<String>,
    pub region: Option<String>,
    pub flavor_profile: Option<String>,
    pub country: Option<String>,
}

impl PartialReply {
    pub fn is_empty(&self) -> bool {
        self == &PartialReply::default()
    }
}

/// Failure of a single strategy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("reply is JSON but not an object")]
    NotAnObject,
    #[error("no recognised key/value lines")]
    NoPairs,
}

/// Every strategy failed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("could not recover a structured reply: {last}")]
pub struct RecoveryError {
    pub last: StageError,
}

type Strategy = fn(&str) -> Result<PartialReply, StageError>;

const STRATEGIES: [(&str, Strategy); 3] = [
    ("direct", parse_direct),
    ("sanitized", parse_sanitized),
    ("key_value_lines", parse_key_value_lines),
];

/// Run the strategies in order and return the first success.
pub fn recover(reply: &str) -> Result<PartialReply, RecoveryError> {
    let mut last = StageError::NoPairs;
    for (name, strategy) in STRATEGIES {
        match strategy(reply) {
            Ok(parsed) => {
                tracing::debug!(strategy = name, "recovered structured reply");
                return Ok(parsed);
            }
            Err(e) => {
                tracing::debug!(strategy = name, error = %e, "recovery strategy failed");
                last = e;
            }
        }
    }
    Err(RecoveryError { last })
}

/// First balanced `{...}` span, ignoring braces inside string literals.
///
/// Returns `None` when there is no opening brace or it is never closed.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

fn json_candidate(reply: &str) -> &str {
    extract_json_object(reply).unwrap_or_else(|| reply.trim())
}

/// Strategy 1: the candidate span is already valid JSON.
pub fn parse_direct(reply: &str) -> Result<PartialReply, StageError> {
    parse_object(json_candidate(reply))
}

/// Strategy 2: repair common JSON mistakes, then parse.
pub fn parse_sanitized(reply: &str) -> Result<PartialReply, StageError> {
    parse_object(&sanitize_json(json_candidate(reply)))
}

/// Strategy 3: `key: value` / `key = value` lines for the known fields.
pub fn parse_key_value_lines(reply: &str) -> Result<PartialReply, StageError> {
    let mut parsed = PartialReply::default();

    for line in reply.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(caps) = KEY_VALUE_LINE.captures(line) else {
            continue;
        };
        let key = caps[1].to_lowercase();
        let value = strip_quotes(caps[2].trim());

        match key.as_str() {
            "is_wine" => parsed.is_wine = Some(value.eq_ignore_ascii_case("true")),
            "alcohol_type" => parsed.alcohol_type = Some(value),
            "type" => parsed.wine_type = Some(value),
            "region" => parsed.region = Some(value),
            "flavor_profile" => parsed.flavor_profile = Some(value),
            "country" => parsed.country = Some(value),
            _ => {}
        }
    }

    if parsed.is_empty() {
        Err(StageError::NoPairs)
    } else {
        Ok(parsed)
    }
}

/// Smart quotes, bare keys, trailing commas and single-quoted strings.
pub fn sanitize_json(input: &str) -> String {
    let mut output = input
        .trim()
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    output = BARE_KEY.replace_all(&output, "${1}\"${2}\":").into_owned();
    output = TRAILING_COMMA.replace_all(&output, "${1}").into_owned();

    if output.contains('\'') {
        output = SINGLE_QUOTED.replace_all(&output, "\"${1}\"").into_owned();
    }

    output
}

fn strip_quotes(value: &str) -> String {
    let once = DOUBLE_QUOTED_VALUE.replace(value, "${1}");
    SINGLE_QUOTED_VALUE.replace(&once, "${1}").into_owned()
}

fn parse_object(candidate: &str) -> Result<PartialReply, StageError> {
    let value: Value =
        serde_json::from_str(candidate).map_err(|e| StageError::Json(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(from_map(&map)),
        _ => Err(StageError::NotAnObject),
    }
}

fn from_map(map: &Map<String, Value>) -> PartialReply {
    PartialReply {
        // Only a real JSON `true` counts; "true" as a string does not.
        is_wine: map.get("is_wine").map(|v| v.as_bool() == Some(true)),
        alcohol_type: text_field(map, "alcohol_type"),
        wine_type: text_field(map, "type"),
        region: text_field(map, "region"),
        flavor_profile: text_field(map, "flavor_profile"),
        country: text_field(map, "country"),
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

const MAX_NAME_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 150;
const ELLIPSIS: &str = "...";

pub const DEFAULT_REGION: &str = "unknown";
pub const DEFAULT_FLAVOR_PROFILE: &str = "full-bodied";
pub const DEFAULT_COUNTRY: &str = "France";

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref LINE_BREAK: Regex = Regex::new(r"\r?\n").unwrap();
}

/// The five canonical wine categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum WineType {
    Red,
    White,
    Rose,
    Sparkling,
    Dessert,
}

impl WineType {
    pub const ALL: [WineType; 5] = [
        WineType::Red,
        WineType::White,
        WineType::Rose,
        WineType::Sparkling,
        WineType::Dessert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WineType::Red => "Red",
            WineType::White => "White",
            WineType::Rose => "Rose",
            WineType::Sparkling => "Sparkling",
            WineType::Dessert => "Dessert",
        }
    }
}

impl fmt::Display for WineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses canonical names only (case-insensitive). Free-form model tokens go
/// through the classifier's normalization table instead.
impl FromStr for WineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        WineType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown wine type '{}'", trimmed))
    }
}

/// Raw record from the third-party catalog. Never mutated after fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    /// Price in minor currency units (yen).
    pub price: i64,
    pub caption: String,
    pub image_urls: Vec<String>,
    pub item_url: String,
}

/// Attributes extracted by the classifier for an accepted wine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WineAttributes {
    pub wine_type: WineType,
    pub region: String,
    pub flavor_profile: String,
    pub country: String,
}

impl Default for WineAttributes {
    fn default() -> Self {
        Self {
            wine_type: WineType::Red,
            region: DEFAULT_REGION.to_string(),
            flavor_profile: DEFAULT_FLAVOR_PROFILE.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

/// A validated catalog row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WineRecord {
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "Chateau Margaux 2015")]
    pub name: String,
    #[serde(rename = "type")]
    pub wine_type: WineType,
    pub region: String,
    pub flavor_profile: String,
    pub country: String,
    pub description: String,
    pub image_url: String,
    pub affiliate_url: String,
    #[schema(example = "3,980円")]
    pub price_range: String,
}

/// A row ready to be inserted; the catalog store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWine {
    pub name: String,
    #[serde(rename = "type")]
    pub wine_type: WineType,
    pub region: String,
    pub flavor_profile: String,
    pub country: String,
    pub description: String,
    pub image_url: String,
    pub affiliate_url: String,
    pub price_range: String,
}

impl NewWine {
    /// Normalize an accepted catalog item into a storable row.
    pub fn from_catalog_item(item: &CatalogItem, attributes: WineAttributes) -> Self {
        Self {
            name: truncate_with_ellipsis(&item.name, MAX_NAME_CHARS),
            wine_type: attributes.wine_type,
            region: attributes.region,
            flavor_profile: attributes.flavor_profile,
            country: attributes.country,
            description: clean_description(&item.caption),
            image_url: item.image_urls.first().cloned().unwrap_or_default(),
            affiliate_url: item.item_url.clone(),
            price_range: format_price_label(item.price),
        }
    }

    pub fn with_id(self, id: i64) -> WineRecord {
        WineRecord {
            id,
            name: self.name,
            wine_type: self.wine_type,
            region: self.region,
            flavor_profile: self.flavor_profile,
            country: self.country,
            description: self.description,
            image_url: self.image_url,
            affiliate_url: self.affiliate_url,
            price_range: self.price_range,
        }
    }
}

/// Cut `text` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Strip HTML tags, collapse line breaks to spaces and cap the length.
pub fn clean_description(caption: &str) -> String {
    let without_tags = HTML_TAG.replace_all(caption, "");
    let single_line = LINE_BREAK.replace_all(&without_tags, " ");
    truncate_with_ellipsis(single_line.trim(), MAX_DESCRIPTION_CHARS)
}

/// Yen label with thousands separators, e.g. `3,980円`.
pub fn format_price_label(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if price < 0 {
        format!("-{}円", grouped)
    } else {
        format!("{}円", grouped)
    }
}

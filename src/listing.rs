use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{OptimizerError, Result};
use crate::orchestrator::Provenance;

pub const TITLE_NOT_FOUND: &str = "Product title not found";
pub const DESCRIPTION_NOT_FOUND: &str = "Product description not available";
pub const PRICE_NOT_FOUND: &str = "Price not available";
pub const RATING_NOT_FOUND: &str = "No rating available";
pub const IMAGE_NOT_FOUND: &str = "Image not available";

static ASIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z0-9]{10}$").expect("Invalid ASIN regex")
});

/// Amazon Standard Identification Number: exactly 10 uppercase letters or digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Asin(String);

impl Asin {
    pub fn parse(raw: &str) -> Result<Self> {
        if ASIN_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(OptimizerError::InvalidInput(format!(
                "'{}' is not a valid 10-character ASIN",
                raw
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Asin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Asin {
    type Error = OptimizerError;

    fn try_from(value: String) -> Result<Self> {
        Asin::parse(&value)
    }
}

impl From<Asin> for String {
    fn from(asin: Asin) -> Self {
        asin.0
    }
}

/// Product facts pulled from a product page.
///
/// Every text field is always present: a field that could not be resolved
/// holds its sentinel string, never an empty value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub asin: Asin,
    pub title: String,
    pub bullet_points: Vec<String>,
    pub description: String,
    pub price: String,
    pub rating: String,
    pub image_url: String,
}

impl ProductDetails {
    pub fn has_description(&self) -> bool {
        self.description != DESCRIPTION_NOT_FOUND
    }
}

/// Rewritten listing copy. All four keys are always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedListing {
    #[serde(default)]
    pub optimized_title: String,
    #[serde(default)]
    pub optimized_bullet_points: Vec<String>,
    #[serde(default)]
    pub optimized_description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Result of one optimize call: the scraped original next to the rewritten copy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedRecord {
    /// Surrogate id assigned by storage
    pub id: Option<i64>,
    pub asin: Asin,
    pub original: ProductDetails,
    pub optimized: OptimizedListing,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub provenance: Provenance,
}

impl OptimizedRecord {
    /// True when any part of the record came from a synthetic template
    pub fn is_synthetic(&self) -> bool {
        self.provenance.is_degraded()
    }
}

use thiserror::Error;

/// Longest slice of a raw model response kept for diagnostics
pub const RAW_EXCERPT_CHARS: usize = 5000;

/// The model response could not be shaped into a listing by any parse strategy.
#[derive(Error, Debug, Clone)]
#[error("model response could not be parsed ({length} chars)")]
pub struct NormalizationError {
    /// Length of the raw response in characters
    pub length: usize,
    /// Leading slice of the raw response, truncated to `RAW_EXCERPT_CHARS`
    pub excerpt: String,
}

impl NormalizationError {
    pub fn new(raw: &str) -> Self {
        Self {
            length: raw.chars().count(),
            excerpt: raw.chars().take(RAW_EXCERPT_CHARS).collect(),
        }
    }
}

/// Pipeline stage a bounded wait belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStage {
    Fetch,
    Model,
}

impl std::fmt::Display for WaitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitStage::Fetch => write!(f, "page fetch"),
            WaitStage::Model => write!(f, "model call"),
        }
    }
}

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    #[error("Scraping failed for ASIN {asin}: {reason}")]
    ScrapeFailed { asin: String, reason: String },

    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: WaitStage, secs: u64 },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error("Database error: {0}")]
    PersistenceError(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] refinery::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Optimization record not found: {0}")]
    RecordNotFound(i64),
}

impl OptimizerError {
    /// Map a transport error, keeping timeouts as their own kind
    pub fn from_transport(err: ureq::Error, stage: WaitStage, secs: u64) -> Self {
        match err {
            ureq::Error::Timeout(_) => OptimizerError::Timeout { stage, secs },
            other => OptimizerError::HttpError(other),
        }
    }

    /// Get an actionable hint for how to resolve this error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            OptimizerError::InvalidInput(_) => Some(
                "An ASIN is 10 uppercase letters or digits, e.g. B08N5WRWNW"
            ),
            OptimizerError::ScrapeFailed { .. } | OptimizerError::ExtractionError(_) => Some(
                "The product page may be blocked or restructured. Retry later, or continue with placeholder data:\n  asinopt optimize <ASIN> --degraded"
            ),
            OptimizerError::Timeout { stage: WaitStage::Fetch, .. } => Some(
                "Raise fetch_timeout_secs in the config file, or try again later"
            ),
            OptimizerError::HttpError(_) => Some(
                "Check your internet connection, or inspect the page with:\n  asinopt extract <ASIN>"
            ),
            OptimizerError::PersistenceError(_) | OptimizerError::MigrationError(_) => Some(
                "Check that the database path is writable (override it with ASINOPT_DB)"
            ),
            OptimizerError::RecordNotFound(_) => Some(
                "Run `asinopt history` to see saved optimizations"
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_error_truncates_excerpt() {
        let raw = "x".repeat(RAW_EXCERPT_CHARS + 250);
        let err = NormalizationError::new(&raw);
        assert_eq!(err.length, RAW_EXCERPT_CHARS + 250);
        assert_eq!(err.excerpt.chars().count(), RAW_EXCERPT_CHARS);
    }

    #[test]
    fn test_transport_timeout_is_distinct() {
        let err = OptimizerError::from_transport(
            ureq::Error::Timeout(ureq::Timeout::Global),
            WaitStage::Fetch,
            10,
        );
        assert!(matches!(err, OptimizerError::Timeout { stage: WaitStage::Fetch, secs: 10 }));

        let err = OptimizerError::from_transport(ureq::Error::HostNotFound, WaitStage::Model, 30);
        assert!(matches!(err, OptimizerError::HttpError(ureq::Error::HostNotFound)));
    }

    #[test]
    fn test_timeout_message_names_stage() {
        let err = OptimizerError::Timeout { stage: WaitStage::Model, secs: 30 };
        assert_eq!(err.to_string(), "model call timed out after 30s");
    }

    #[test]
    fn test_hint_for_scrape_failure() {
        let err = OptimizerError::ScrapeFailed {
            asin: "B08N5WRWNW".into(),
            reason: "not found".into(),
        };
        assert!(err.hint().unwrap().contains("--degraded"));
    }
}

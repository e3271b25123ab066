//! Generative-model capability and the deterministic synthetic templates used
//! whenever real data is unavailable.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::error::{OptimizerError, Result, WaitStage};
use crate::listing::{Asin, OptimizedListing, ProductDetails};

/// What a model caller produced for one prompt
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Raw model text, still to be normalized
    Text(String),
    /// A ready listing from a synthetic template
    Synthetic(OptimizedListing),
}

/// Something that turns a prompt into listing copy.
///
/// Picked once when the orchestrator is built: `LiveModelCaller` talks to the
/// model API, `SyntheticModelCaller` answers from a fixed template.
pub trait ModelCaller: Send + Sync {
    fn name(&self) -> &str;

    fn complete(&self, product: &ProductDetails, prompt: &str) -> Result<Completion>;
}

/// Build the caller a configuration asks for
pub fn caller_from_config(config: &ModelConfig) -> Box<dyn ModelCaller> {
    match config.api_key.as_deref().filter(|key| !key.trim().is_empty()) {
        Some(key) => {
            info!(model = %config.name, "using live model");
            Box::new(LiveModelCaller::new(&config.endpoint, &config.name, key, config.timeout_secs))
        }
        None => {
            warn!("no model API key configured, listings will use the synthetic template");
            Box::new(SyntheticModelCaller)
        }
    }
}

/// Calls the Generative Language `generateContent` endpoint
pub struct LiveModelCaller {
    agent: ureq::Agent,
    url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl LiveModelCaller {
    pub fn new(endpoint: &str, model: &str, api_key: &str, timeout_secs: u64) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs)))
            .build()
            .into();
        Self {
            agent,
            url: format!("{}/models/{}:generateContent", endpoint.trim_end_matches('/'), model),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout_secs,
        }
    }

    fn transport_error(&self, err: ureq::Error) -> OptimizerError {
        match OptimizerError::from_transport(err, WaitStage::Model, self.timeout_secs) {
            timeout @ OptimizerError::Timeout { .. } => timeout,
            other => OptimizerError::ModelUnavailable(other.to_string()),
        }
    }
}

impl ModelCaller for LiveModelCaller {
    fn name(&self) -> &str {
        &self.model
    }

    fn complete(&self, _product: &ProductDetails, prompt: &str) -> Result<Completion> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        debug!(model = %self.model, prompt_chars = prompt.len(), "calling model");
        let response = self
            .agent
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .send_json(&body)
            .map_err(|e| self.transport_error(e))?;

        let payload: serde_json::Value = response
            .into_body()
            .read_json()
            .map_err(|e| self.transport_error(e))?;

        let text = response_text(&payload).ok_or_else(|| {
            OptimizerError::ModelUnavailable("model returned no text candidates".into())
        })?;
        Ok(Completion::Text(text))
    }
}

/// Concatenated text parts of the first candidate
fn response_text(payload: &serde_json::Value) -> Option<String> {
    let parts = payload["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

/// Answers every prompt with the synthetic listing template
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticModelCaller;

impl ModelCaller for SyntheticModelCaller {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn complete(&self, product: &ProductDetails, _prompt: &str) -> Result<Completion> {
        Ok(Completion::Synthetic(synthetic_listing(product)))
    }
}

/// Stand-in product record, fixed apart from the ASIN
pub fn synthetic_product(asin: &Asin) -> ProductDetails {
    ProductDetails {
        asin: asin.clone(),
        title: format!("Sample Product {} - Premium Quality Item", asin),
        bullet_points: vec![
            "High-quality materials for durability".into(),
            "Easy to use with clear instructions".into(),
            "Versatile for multiple applications".into(),
            "Backed by manufacturer warranty".into(),
            "Customer favorite with excellent reviews".into(),
        ],
        description: format!(
            "This is a detailed description of the product with ASIN {}. \
             It includes information about features, specifications, and benefits. \
             The product is designed to meet customer needs with reliable performance. \
             Perfect for both beginners and professionals seeking quality and reliability.",
            asin
        ),
        price: "$49.99".into(),
        rating: "4.5 out of 5 stars".into(),
        image_url: "https://via.placeholder.com/300x300.png?text=Product+Image".into(),
    }
}

/// Stand-in listing derived only from the product title
pub fn synthetic_listing(product: &ProductDetails) -> OptimizedListing {
    let base_title = if product.title.trim().is_empty() {
        "Original Product"
    } else {
        product.title.as_str()
    };
    let first_word = base_title.split_whitespace().next().unwrap_or("Product");
    let short_title: String = base_title.chars().take(150).collect();

    OptimizedListing {
        optimized_title: format!("[OPTIMIZED] {} - Premium Quality & Best Value", short_title),
        optimized_bullet_points: vec![
            "PROFESSIONAL GRADE: Enhanced performance for superior results".into(),
            "PREMIUM QUALITY: Made with high-grade materials for durability".into(),
            "EASY TO USE: User-friendly design for all skill levels".into(),
            "GREAT VALUE: Competitive pricing with premium features".into(),
            "SATISFACTION GUARANTEE: Risk-free purchase with excellent support".into(),
        ],
        optimized_description: format!(
            "Discover the ultimate {} experience with our premium optimized version.\n\n\
             Why choose our product? Enhanced performance for better results, premium \
             materials for long-lasting durability, and a user-friendly design suitable \
             for everyone.\n\n\
             Experience the difference today with our risk-free satisfaction guarantee.",
            first_word
        ),
        keywords: vec![
            "best selling product".into(),
            "premium quality".into(),
            "amazon choice".into(),
            format!("{} enhanced", first_word.to_lowercase()),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asin() -> Asin {
        Asin::parse("B0TEST0001").unwrap()
    }

    #[test]
    fn test_synthetic_product_is_deterministic() {
        let a = synthetic_product(&asin());
        let b = synthetic_product(&asin());
        assert_eq!(a, b);
        assert_eq!(a.title, "Sample Product B0TEST0001 - Premium Quality Item");
        assert_eq!(a.bullet_points.len(), 5);
        assert!(a.description.contains("B0TEST0001"));
    }

    #[test]
    fn test_synthetic_listing_template() {
        let listing = synthetic_listing(&synthetic_product(&asin()));
        assert_eq!(
            listing.optimized_title,
            "[OPTIMIZED] Sample Product B0TEST0001 - Premium Quality Item - Premium Quality & Best Value"
        );
        assert_eq!(listing.optimized_bullet_points.len(), 5);
        assert!(listing.optimized_description.contains("ultimate Sample experience"));
        assert_eq!(listing.keywords.len(), 4);
        assert_eq!(listing.keywords[3], "sample enhanced");
    }

    #[test]
    fn test_synthetic_listing_truncates_title() {
        let mut product = synthetic_product(&asin());
        product.title = "x".repeat(400);
        let listing = synthetic_listing(&product);
        let expected = format!("[OPTIMIZED] {} - Premium Quality & Best Value", "x".repeat(150));
        assert_eq!(listing.optimized_title, expected);
    }

    #[test]
    fn test_synthetic_caller_returns_listing() {
        let product = synthetic_product(&asin());
        let completion = SyntheticModelCaller.complete(&product, "ignored").unwrap();
        assert_eq!(completion, Completion::Synthetic(synthetic_listing(&product)));
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let payload = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
        });
        assert_eq!(response_text(&payload), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn test_response_text_missing() {
        assert_eq!(response_text(&json!({ "candidates": [] })), None);
        assert_eq!(response_text(&json!({ "error": { "code": 400 } })), None);
    }

    #[test]
    fn test_caller_from_config_without_key_is_synthetic() {
        let config = ModelConfig { api_key: None, ..ModelConfig::default() };
        assert_eq!(caller_from_config(&config).name(), "synthetic");

        let blank = ModelConfig { api_key: Some("  ".into()), ..ModelConfig::default() };
        assert_eq!(caller_from_config(&blank).name(), "synthetic");
    }

    #[test]
    fn test_caller_from_config_with_key_is_live() {
        let config = ModelConfig { api_key: Some("secret".into()), ..ModelConfig::default() };
        assert_eq!(caller_from_config(&config).name(), config.name);
    }
}

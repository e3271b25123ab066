//! Sequences scrape, extraction, prompting, the model call and normalization
//! into one `optimize` operation, falling back to synthetic data where a
//! stage can be worked around.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::db::ListingStore;
use crate::error::{OptimizerError, Result, WaitStage};
use crate::extract::ProductExtractionPipeline;
use crate::fetch::PageSource;
use crate::listing::{Asin, OptimizedListing, OptimizedRecord, ProductDetails};
use crate::model::{synthetic_listing, synthetic_product, Completion, ModelCaller};
use crate::normalize::{normalize_with_strategy, ParseStrategy};
use crate::prompt::build_prompt;

/// Where a piece of the record came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Origin {
    #[default]
    Genuine,
    Synthetic,
}

/// States an optimize call moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scraping,
    Extracted,
    Prompting,
    ModelInvoked,
    Normalized,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Scraping => "scraping",
            Stage::Extracted => "extracted",
            Stage::Prompting => "prompting",
            Stage::ModelInvoked => "model-invoked",
            Stage::Normalized => "normalized",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A stage that was worked around with synthetic data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// Scraping failed and degraded mode substituted the synthetic product
    ExtractionDegraded(String),
    /// The model call failed
    ModelUnavailable(String),
    /// The model answered but no parse strategy could shape the text
    NormalizationFailed { length: usize },
    /// No live model is configured
    NoModelConfigured,
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Degradation::ExtractionDegraded(reason) => {
                write!(f, "extraction degraded: {}", reason)
            }
            Degradation::ModelUnavailable(reason) => write!(f, "model unavailable: {}", reason),
            Degradation::NormalizationFailed { length } => {
                write!(f, "model response unparseable ({} chars)", length)
            }
            Degradation::NoModelConfigured => write!(f, "no model configured"),
        }
    }
}

/// How a record was produced: which parts are genuine, which stages ran,
/// and what was substituted along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provenance {
    pub product: Origin,
    pub listing: Origin,
    /// Parse strategy that shaped the model output, when the model answered usefully
    pub strategy: Option<ParseStrategy>,
    pub degradations: Vec<Degradation>,
    pub trail: Vec<Stage>,
}

impl Provenance {
    /// True when any part of the record is synthetic
    pub fn is_degraded(&self) -> bool {
        self.product == Origin::Synthetic || self.listing == Origin::Synthetic
    }

    fn enter(&mut self, stage: Stage) {
        debug!(%stage, "stage transition");
        self.trail.push(stage);
    }
}

pub struct OptimizationOrchestrator {
    pipeline: ProductExtractionPipeline,
    pages: Box<dyn PageSource>,
    model: Box<dyn ModelCaller>,
    store: Box<dyn ListingStore>,
    degraded_mode: bool,
}

impl OptimizationOrchestrator {
    pub fn new(
        pipeline: ProductExtractionPipeline,
        pages: Box<dyn PageSource>,
        model: Box<dyn ModelCaller>,
        store: Box<dyn ListingStore>,
        degraded_mode: bool,
    ) -> Self {
        Self {
            pipeline,
            pages,
            model,
            store,
            degraded_mode,
        }
    }

    /// Produce and persist an optimized listing for one ASIN.
    ///
    /// Fails on an invalid ASIN, on a scrape failure outside degraded mode, and
    /// on any storage failure. Model and normalization failures never fail the
    /// call; they yield the synthetic listing and are recorded in the provenance.
    pub fn optimize(&self, asin: &str) -> Result<OptimizedRecord> {
        let asin = Asin::parse(asin)?;
        let mut provenance = Provenance::default();

        provenance.enter(Stage::Scraping);
        let original = self.scrape(&asin, &mut provenance)?;
        provenance.enter(Stage::Extracted);

        provenance.enter(Stage::Prompting);
        let prompt = build_prompt(&original);
        let optimized = self.rewrite(&original, &prompt, &mut provenance);

        let mut record = OptimizedRecord {
            id: None,
            asin: asin.clone(),
            original,
            optimized,
            created_at: Utc::now(),
            provenance,
        };

        let saved = self.store.save(&record)?;
        record.id = Some(saved.id);
        record.created_at = saved.created_at;
        record.provenance.enter(Stage::Done);

        info!(
            asin = %asin,
            id = saved.id,
            synthetic = record.is_synthetic(),
            "optimization saved"
        );
        Ok(record)
    }

    fn scrape(&self, asin: &Asin, provenance: &mut Provenance) -> Result<ProductDetails> {
        let scraped = self
            .pages
            .fetch(asin)
            .and_then(|html| self.pipeline.run_html(&html, asin));

        let err = match scraped {
            Ok(details) => return Ok(details),
            Err(err) if is_scrape_failure(&err) => err,
            Err(err) => return Err(err),
        };

        if !self.degraded_mode {
            // Fetch timeouts keep their own kind
            return Err(match err {
                OptimizerError::ExtractionError(_) => OptimizerError::ScrapeFailed {
                    asin: asin.to_string(),
                    reason: "Product not found or page structure changed".to_string(),
                },
                OptimizerError::HttpError(transport) => OptimizerError::ScrapeFailed {
                    asin: asin.to_string(),
                    reason: transport.to_string(),
                },
                other => other,
            });
        }

        warn!(asin = %asin, error = %err, "scrape failed, continuing with synthetic product data");
        provenance.product = Origin::Synthetic;
        provenance
            .degradations
            .push(Degradation::ExtractionDegraded(err.to_string()));
        Ok(synthetic_product(asin))
    }

    fn rewrite(
        &self,
        original: &ProductDetails,
        prompt: &str,
        provenance: &mut Provenance,
    ) -> OptimizedListing {
        let raw = match self.model.complete(original, prompt) {
            Ok(Completion::Text(raw)) => raw,
            Ok(Completion::Synthetic(listing)) => {
                warn!(asin = %original.asin, "no model configured, using synthetic listing");
                provenance.listing = Origin::Synthetic;
                provenance.degradations.push(Degradation::NoModelConfigured);
                return listing;
            }
            Err(err) => {
                warn!(asin = %original.asin, model = self.model.name(), error = %err, "model unavailable, using synthetic listing");
                provenance.listing = Origin::Synthetic;
                provenance
                    .degradations
                    .push(Degradation::ModelUnavailable(err.to_string()));
                return synthetic_listing(original);
            }
        };
        provenance.enter(Stage::ModelInvoked);

        match normalize_with_strategy(&raw) {
            Ok((listing, strategy)) => {
                provenance.strategy = Some(strategy);
                provenance.enter(Stage::Normalized);
                listing
            }
            Err(err) => {
                warn!(asin = %original.asin, length = err.length, "model response unparseable, using synthetic listing");
                debug!(excerpt = %err.excerpt, "unparseable model response");
                provenance.listing = Origin::Synthetic;
                provenance
                    .degradations
                    .push(Degradation::NormalizationFailed { length: err.length });
                synthetic_listing(original)
            }
        }
    }
}

/// Failures of the scrape stage that degraded mode may work around
fn is_scrape_failure(err: &OptimizerError) -> bool {
    matches!(
        err,
        OptimizerError::ExtractionError(_)
            | OptimizerError::ScrapeFailed { .. }
            | OptimizerError::HttpError(_)
            | OptimizerError::Timeout { stage: WaitStage::Fetch, .. }
    )
}

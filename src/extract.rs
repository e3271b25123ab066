use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::{OptimizerError, Result};
use crate::listing::{
    Asin, ProductDetails, DESCRIPTION_NOT_FOUND, IMAGE_NOT_FOUND, PRICE_NOT_FOUND,
    RATING_NOT_FOUND, TITLE_NOT_FOUND,
};
use crate::sanitize::sanitize;

// Selector tables, highest priority first. Product pages change markup often,
// so each field keeps every layout it has been seen in.

const TITLE_SELECTORS: &[&str] = &[
    "#productTitle",
    "#title",
    "h1#title",
    "span#productTitle",
    ".product-title-word-break",
];

const BULLET_SELECTORS: &[&str] = &[
    "#feature-bullets ul li",
    ".a-unordered-list .a-list-item",
    "#important-information ul li",
];

const BULLET_FALLBACK: &str = r#"[data-feature-name="feature"]"#;

// A+ content is mostly style and script markup, so text sections come first.
const DESCRIPTION_SELECTORS: &[&str] = &[
    "#featurebullets-btf",
    r#"[data-feature-name="featurebullets"]"#,
    "#aplus_feature_div",
    "#productDescription",
    "#descriptionAndDetails",
];

const DESCRIPTION_FALLBACK: &str = "#feature-bullets";

const PRICE_SELECTORS: &[&str] = &[
    ".a-price-whole",
    ".a-price.a-text-price.a-size-medium.a-color-price",
    r#"[data-a-color="price"]"#,
];

const RATING_SELECTORS: &[&str] = &[
    ".a-icon-star span",
    "[data-a-icon-star-small-part] span",
    ".a-icon-star-small span",
];

const IMAGE_SELECTORS: &[&str] = &["#landingImage", ".a-dynamic-image", "#altImages img"];

/// Bullets must be longer than this many characters
const MIN_BULLET_CHARS: usize = 5;
/// Bullets collected from a single selector
const BULLET_COLLECT_CAP: usize = 10;
/// Bullets kept in the final record
const BULLET_RETURN_CAP: usize = 5;
/// Sanitized descriptions must be longer than this many characters
const MIN_DESCRIPTION_CHARS: usize = 50;

/// Per-candidate acceptance check over cleaned text
pub type Predicate = fn(&str) -> bool;

/// Cleanup applied to a candidate before it is checked
pub type Cleaner = fn(&str) -> String;

/// What a probe reads from the elements its selector matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Text of every match, joined
    AllText,
    /// Text of the first match
    FirstText,
    /// An attribute of the first match
    FirstAttr(&'static str),
}

/// A compiled CSS query plus what to capture from it
#[derive(Debug, Clone)]
pub struct Probe {
    css: &'static str,
    selector: Selector,
    capture: Capture,
}

impl Probe {
    pub fn new(css: &'static str, capture: Capture) -> Result<Self> {
        let selector = Selector::parse(css)
            .map_err(|e| OptimizerError::ExtractionError(format!("Invalid selector '{}': {:?}", css, e)))?;
        Ok(Self { css, selector, capture })
    }

    pub fn css(&self) -> &'static str {
        self.css
    }

    /// Candidate text for a scalar field, if the selector matched anything
    fn scalar(&self, document: &Html) -> Option<String> {
        let mut matches = document.select(&self.selector).peekable();
        matches.peek()?;

        match self.capture {
            Capture::AllText => Some(
                matches
                    .map(element_text)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Capture::FirstText => matches.next().map(element_text),
            Capture::FirstAttr(attr) => matches
                .next()
                .and_then(|el| el.value().attr(attr))
                .map(String::from),
        }
    }

    /// Text of each matched element, in document order
    fn each_text(&self, document: &Html) -> Vec<String> {
        document.select(&self.selector).map(element_text).collect()
    }
}

// Text nodes are concatenated as-is so inline markup (`<sup>`, nested price
// spans) does not split words. The field cleaner collapses whitespace.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One entry of a selector chain
#[derive(Debug, Clone)]
pub struct Strategy {
    pub probe: Probe,
    pub accept: Option<Predicate>,
}

impl Strategy {
    pub fn new(probe: Probe) -> Self {
        Self { probe, accept: None }
    }

    pub fn accepting(probe: Probe, accept: Predicate) -> Self {
        Self { probe, accept: Some(accept) }
    }

    fn accepts(&self, candidate: &str) -> bool {
        self.accept.map_or(true, |accept| accept(candidate))
    }
}

fn selector_chain(selectors: &[&'static str], capture: Capture, accept: Option<Predicate>) -> Result<Vec<Strategy>> {
    selectors
        .iter()
        .map(|css| {
            Ok(Strategy {
                probe: Probe::new(*css, capture)?,
                accept,
            })
        })
        .collect()
}

/// Outcome of running one field extractor
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<T> {
    pub value: T,
    pub found: bool,
    /// Selector that produced the value
    pub matched: Option<&'static str>,
}

impl<T> Extracted<T> {
    fn hit(value: T, matched: &'static str) -> Self {
        Self { value, found: true, matched: Some(matched) }
    }

    fn miss(value: T) -> Self {
        Self { value, found: false, matched: None }
    }
}

/// Pulls one field out of a parsed document by trying strategies in priority order.
///
/// The first strategy producing an accepted result wins; results are never
/// merged across strategies. A field that cannot be resolved yields its
/// sentinel with `found == false`.
pub trait FieldExtractor {
    type Value;

    fn field(&self) -> &'static str;

    fn extract(&self, document: &Html) -> Extracted<Self::Value>;
}

/// Extractor for a single text value
#[derive(Debug, Clone)]
pub struct TextField {
    name: &'static str,
    strategies: Vec<Strategy>,
    fallback: Option<Strategy>,
    clean: Cleaner,
    sentinel: &'static str,
}

impl TextField {
    pub fn new(name: &'static str, strategies: Vec<Strategy>, sentinel: &'static str) -> Self {
        Self {
            name,
            strategies,
            fallback: None,
            clean: collapse_whitespace,
            sentinel,
        }
    }

    pub fn with_fallback(mut self, fallback: Strategy) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_cleaner(mut self, clean: Cleaner) -> Self {
        self.clean = clean;
        self
    }

    fn try_strategy(&self, strategy: &Strategy, document: &Html) -> Option<String> {
        let raw = strategy.probe.scalar(document)?;
        let candidate = (self.clean)(&raw);
        let candidate = candidate.trim();
        if candidate.is_empty() || !strategy.accepts(candidate) {
            return None;
        }
        Some(candidate.to_string())
    }
}

impl FieldExtractor for TextField {
    type Value = String;

    fn field(&self) -> &'static str {
        self.name
    }

    fn extract(&self, document: &Html) -> Extracted<String> {
        for strategy in self.strategies.iter().chain(self.fallback.as_ref()) {
            if let Some(value) = self.try_strategy(strategy, document) {
                debug!(field = self.field(), selector = strategy.probe.css(), "field extracted");
                return Extracted::hit(value, strategy.probe.css());
            }
        }
        debug!(field = self.field(), "no selector matched, using sentinel");
        Extracted::miss(self.sentinel.to_string())
    }
}

/// Extractor for an ordered list of entries (bullet points)
#[derive(Debug, Clone)]
pub struct ListField {
    name: &'static str,
    strategies: Vec<Strategy>,
    fallback: Option<Probe>,
    min_entry_chars: usize,
    collect_cap: usize,
    return_cap: usize,
}

impl ListField {
    pub fn new(name: &'static str, strategies: Vec<Strategy>) -> Self {
        Self {
            name,
            strategies,
            fallback: None,
            min_entry_chars: MIN_BULLET_CHARS,
            collect_cap: BULLET_COLLECT_CAP,
            return_cap: BULLET_RETURN_CAP,
        }
    }

    /// Broader section read when no strategy yields an entry. Its entries
    /// skip the length check.
    pub fn with_fallback(mut self, fallback: Probe) -> Self {
        self.fallback = Some(fallback);
        self
    }

    fn collect(&self, strategy: &Strategy, document: &Html) -> Vec<String> {
        let mut entries = Vec::new();
        for text in strategy.probe.each_text(document) {
            if entries.len() >= self.collect_cap {
                break;
            }
            let entry = collapse_whitespace(&text);
            if entry.chars().count() > self.min_entry_chars && strategy.accepts(&entry) {
                entries.push(entry);
            }
        }
        entries
    }
}

impl FieldExtractor for ListField {
    type Value = Vec<String>;

    fn field(&self) -> &'static str {
        self.name
    }

    fn extract(&self, document: &Html) -> Extracted<Vec<String>> {
        for strategy in &self.strategies {
            let mut entries = self.collect(strategy, document);
            if !entries.is_empty() {
                entries.truncate(self.return_cap);
                debug!(field = self.field(), selector = strategy.probe.css(), count = entries.len(), "list extracted");
                return Extracted::hit(entries, strategy.probe.css());
            }
        }

        if let Some(fallback) = &self.fallback {
            let mut entries: Vec<String> = fallback
                .each_text(document)
                .iter()
                .map(|text| collapse_whitespace(text))
                .filter(|entry| !entry.is_empty())
                .collect();
            if !entries.is_empty() {
                entries.truncate(self.return_cap);
                debug!(field = self.field(), selector = fallback.css(), "list taken from fallback section");
                return Extracted::hit(entries, fallback.css());
            }
        }

        debug!(field = self.field(), "no entries found");
        Extracted::miss(Vec::new())
    }
}

fn description_long_enough(text: &str) -> bool {
    text.chars().count() > MIN_DESCRIPTION_CHARS
}

/// Composes the field extractors and the sanitizer into a `ProductDetails` record.
#[derive(Debug, Clone)]
pub struct ProductExtractionPipeline {
    pub title: TextField,
    pub bullets: ListField,
    pub description: TextField,
    pub price: TextField,
    pub rating: TextField,
    pub image: TextField,
}

impl ProductExtractionPipeline {
    /// Pipeline with the Amazon product page selector tables
    pub fn amazon() -> Result<Self> {
        Ok(Self {
            title: TextField::new(
                "title",
                selector_chain(TITLE_SELECTORS, Capture::AllText, None)?,
                TITLE_NOT_FOUND,
            ),
            bullets: ListField::new("bulletPoints", selector_chain(BULLET_SELECTORS, Capture::AllText, None)?)
                .with_fallback(Probe::new(BULLET_FALLBACK, Capture::AllText)?),
            description: TextField::new(
                "description",
                selector_chain(DESCRIPTION_SELECTORS, Capture::AllText, Some(description_long_enough))?,
                DESCRIPTION_NOT_FOUND,
            )
            .with_cleaner(sanitize)
            .with_fallback(Strategy::accepting(
                Probe::new(DESCRIPTION_FALLBACK, Capture::AllText)?,
                description_long_enough,
            )),
            price: TextField::new(
                "price",
                selector_chain(PRICE_SELECTORS, Capture::FirstText, None)?,
                PRICE_NOT_FOUND,
            ),
            rating: TextField::new(
                "rating",
                selector_chain(RATING_SELECTORS, Capture::FirstText, None)?,
                RATING_NOT_FOUND,
            ),
            image: TextField::new(
                "imageUrl",
                selector_chain(IMAGE_SELECTORS, Capture::FirstAttr("src"), None)?,
                IMAGE_NOT_FOUND,
            ),
        })
    }

    /// Extract a product record from a parsed page.
    ///
    /// Fails only when the title cannot be found; every other field degrades
    /// to its sentinel.
    pub fn run(&self, document: &Html, asin: &Asin) -> Result<ProductDetails> {
        let title = self.title.extract(document);
        if !title.found {
            warn!(asin = %asin, field = self.title.field(), "required field not found on page");
            return Err(OptimizerError::ExtractionError("not found".into()));
        }

        let details = ProductDetails {
            asin: asin.clone(),
            title: title.value,
            bullet_points: self.bullets.extract(document).value,
            description: self.description.extract(document).value,
            price: self.price.extract(document).value,
            rating: self.rating.extract(document).value,
            image_url: self.image.extract(document).value,
        };

        debug!(
            asin = %asin,
            bullets = details.bullet_points.len(),
            has_description = details.has_description(),
            "product extracted"
        );
        Ok(details)
    }

    /// Parse raw HTML and extract a product record from it
    pub fn run_html(&self, html: &str, asin: &Asin) -> Result<ProductDetails> {
        let document = Html::parse_document(html);
        self.run(&document, asin)
    }
}

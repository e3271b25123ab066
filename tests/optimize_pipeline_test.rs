//! End-to-end tests of the optimize pipeline with local page and model doubles

use std::rc::Rc;

use asinopt::db::{Database, ListingStore, OptimizationRow};
use asinopt::error::{OptimizerError, Result};
use asinopt::extract::ProductExtractionPipeline;
use asinopt::fetch::StaticPageSource;
use asinopt::listing::{Asin, OptimizedRecord, ProductDetails, DESCRIPTION_NOT_FOUND};
use asinopt::model::{synthetic_listing, Completion, ModelCaller, SyntheticModelCaller};
use asinopt::normalize::ParseStrategy;
use asinopt::orchestrator::{Degradation, OptimizationOrchestrator, Origin};

// ============================================================================
// Fixtures
// ============================================================================

const PRODUCT_PAGE: &str = r#"
<!DOCTYPE html>
<html>
<head>
    <title>Amazon.com: Acme Conical Burr Grinder</title>
    <style>.a-box{border:1px solid #ddd}</style>
</head>
<body>
    <div id="centerCol">
        <h1 id="title"><span id="productTitle">
            Acme Conical Burr Coffee Grinder, 18 Settings
        </span></h1>
        <i class="a-icon a-icon-star"><span class="a-icon-alt">4.6 out of 5 stars</span></i>
        <span class="a-price"><span class="a-price-whole">49<span class="a-price-decimal">.</span></span><span class="a-price-fraction">99</span></span>
        <div id="feature-bullets">
            <ul class="a-unordered-list">
                <li><span class="a-list-item">Fit</span></li>
                <li><span class="a-list-item">18 grind settings from espresso to French press</span></li>
                <li><span class="a-list-item">Stainless steel conical burrs stay sharp for years</span></li>
                <li><span class="a-list-item">Quiet motor keeps the kitchen calm in the morning</span></li>
            </ul>
        </div>
    </div>
    <div id="imgTagWrapperId">
        <img id="landingImage" src="https://images.example.com/acme-grinder.jpg">
    </div>
    <div id="productDescription">
        <script>P.when('A').execute(function(A){ A.init(); });</script>
        <p>Brew better coffee at home with a grinder that delivers an even, consistent grind every time.</p>
        <p>Visit https://acme.example.com/support for the user manual.</p>
    </div>
</body>
</html>
"#;

const ROBOT_CHECK_PAGE: &str = r#"
<html><body>
    <h4>Enter the characters you see below</h4>
    <form action="/errors/validateCaptcha"><input id="captchacharacters"></form>
</body></html>
"#;

/// Replays a fixed model answer
struct ScriptedModel {
    answer: std::result::Result<String, String>,
}

impl ScriptedModel {
    fn answering(text: &str) -> Box<Self> {
        Box::new(Self { answer: Ok(text.to_string()) })
    }

    fn failing(reason: &str) -> Box<Self> {
        Box::new(Self { answer: Err(reason.to_string()) })
    }
}

impl ModelCaller for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete(&self, product: &ProductDetails, prompt: &str) -> Result<Completion> {
        assert!(prompt.contains(&product.title), "prompt should carry the product title");
        match &self.answer {
            Ok(text) => Ok(Completion::Text(text.clone())),
            Err(reason) => Err(OptimizerError::ModelUnavailable(reason.clone())),
        }
    }
}

/// Lets a test read back what the orchestrator saved
struct SharedStore(Rc<Database>);

impl ListingStore for SharedStore {
    fn save(&self, record: &OptimizedRecord) -> Result<OptimizationRow> {
        self.0.save(record)
    }
}

fn orchestrator(page: &str, model: Box<dyn ModelCaller>, degraded: bool) -> OptimizationOrchestrator {
    OptimizationOrchestrator::new(
        ProductExtractionPipeline::amazon().unwrap(),
        Box::new(StaticPageSource::new(page)),
        model,
        Box::new(Database::open_in_memory().unwrap()),
        degraded,
    )
}

// ============================================================================
// Extraction over a realistic page
// ============================================================================

#[test]
fn test_extracts_realistic_page() {
    let asin = Asin::parse("B0ACME0001").unwrap();
    let details = ProductExtractionPipeline::amazon()
        .unwrap()
        .run_html(PRODUCT_PAGE, &asin)
        .unwrap();

    assert_eq!(details.title, "Acme Conical Burr Coffee Grinder, 18 Settings");
    assert_eq!(details.bullet_points.len(), 3);
    assert_eq!(details.bullet_points[0], "18 grind settings from espresso to French press");
    assert_eq!(details.price, "49.");
    assert_eq!(details.rating, "4.6 out of 5 stars");
    assert_eq!(details.image_url, "https://images.example.com/acme-grinder.jpg");

    assert_ne!(details.description, DESCRIPTION_NOT_FOUND);
    assert!(details.description.contains("Brew better coffee at home"));
    assert!(!details.description.contains("when("));
    assert!(!details.description.contains("function"));
    assert!(!details.description.contains("https://"));
}

// ============================================================================
// Orchestrator flows
// ============================================================================

#[test]
fn test_fenced_model_answer_is_normalized() {
    let answer = "```json\n{\n  \"optimizedTitle\": \"Acme Conical Burr Coffee Grinder with 18 Grind Settings\",\n  \"optimizedBulletPoints\": [\"Even grind\", \"Quiet motor\", \"Steel burrs\"],\n  \"optimizedDescription\": \"Great coffee starts here.\",\n  \"keywords\": [\"burr grinder\", \"coffee grinder\", \"conical burr grinder\"]\n}\n```";
    let record = orchestrator(PRODUCT_PAGE, ScriptedModel::answering(answer), false)
        .optimize("B0ACME0001")
        .unwrap();

    assert!(!record.is_synthetic());
    assert_eq!(record.provenance.strategy, Some(ParseStrategy::Substring));
    assert_eq!(record.optimized.optimized_bullet_points.len(), 3);
    assert_eq!(record.optimized.keywords[0], "burr grinder");
    assert_eq!(record.original.title, "Acme Conical Burr Coffee Grinder, 18 Settings");
}

#[test]
fn test_prose_answer_recovered_line_by_line() {
    let answer = "Sure! Here's the listing.\noptimizedTitle: Acme Burr Grinder\nkeywords: burr grinder, coffee grinder";
    let record = orchestrator(PRODUCT_PAGE, ScriptedModel::answering(answer), false)
        .optimize("B0ACME0001")
        .unwrap();

    assert_eq!(record.provenance.strategy, Some(ParseStrategy::LineBased));
    assert_eq!(record.optimized.optimized_title, "Acme Burr Grinder");
    assert_eq!(record.optimized.keywords, vec!["burr grinder", "coffee grinder"]);
    assert!(record.optimized.optimized_bullet_points.is_empty());
}

#[test]
fn test_robot_check_page_fails_outside_degraded_mode() {
    let err = orchestrator(ROBOT_CHECK_PAGE, Box::new(SyntheticModelCaller), false)
        .optimize("B0ACME0001")
        .unwrap_err();
    assert!(matches!(err, OptimizerError::ScrapeFailed { ref asin, .. } if asin == "B0ACME0001"));
    assert!(err.hint().is_some());
}

#[test]
fn test_robot_check_page_degrades_and_is_flagged() {
    let record = orchestrator(ROBOT_CHECK_PAGE, Box::new(SyntheticModelCaller), true)
        .optimize("B0ACME0001")
        .unwrap();

    assert_eq!(record.original.title, "Sample Product B0ACME0001 - Premium Quality Item");
    assert_eq!(record.optimized, synthetic_listing(&record.original));
    assert_eq!(record.provenance.product, Origin::Synthetic);
    assert_eq!(record.provenance.listing, Origin::Synthetic);
    assert_eq!(record.provenance.degradations.len(), 2);
}

#[test]
fn test_model_outage_never_fails_the_call() {
    let record = orchestrator(PRODUCT_PAGE, ScriptedModel::failing("503 from model"), false)
        .optimize("B0ACME0001")
        .unwrap();

    assert!(record.id.is_some());
    assert_eq!(record.provenance.product, Origin::Genuine);
    assert_eq!(record.provenance.listing, Origin::Synthetic);
    assert!(matches!(
        &record.provenance.degradations[..],
        [Degradation::ModelUnavailable(_)]
    ));
}

#[test]
fn test_json_output_hides_provenance() {
    let record = orchestrator(PRODUCT_PAGE, Box::new(SyntheticModelCaller), false)
        .optimize("B0ACME0001")
        .unwrap();
    let json = serde_json::to_value(&record).unwrap();

    assert!(json.get("provenance").is_none());
    assert_eq!(json["asin"], "B0ACME0001");
    assert!(json["optimized"]["optimizedTitle"].as_str().unwrap().starts_with("[OPTIMIZED]"));
    assert!(json["original"]["bulletPoints"].is_array());
}

#[test]
fn test_records_land_in_storage() {
    let db = Rc::new(Database::open_in_memory().unwrap());
    let asin = Asin::parse("B0ACME0001").unwrap();
    let orch = OptimizationOrchestrator::new(
        ProductExtractionPipeline::amazon().unwrap(),
        Box::new(StaticPageSource::new(PRODUCT_PAGE)),
        Box::new(SyntheticModelCaller),
        Box::new(SharedStore(Rc::clone(&db))),
        false,
    );

    assert!(!db.asin_exists(&asin).unwrap());
    let record = orch.optimize(asin.as_str()).unwrap();

    let history = db.history(&asin).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(Some(history[0].id), record.id);
    assert_eq!(history[0].created_at, record.created_at);
    assert_eq!(history[0].original_bullets, record.original.bullet_points);
    assert_eq!(history[0].keywords, record.optimized.keywords);

    let again = orch.optimize(asin.as_str()).unwrap();
    assert_eq!(db.history(&asin).unwrap().len(), 2);
    assert_eq!(db.latest(&asin).unwrap().map(|row| row.id), again.id);
}

//! Commands that run a single pipeline stage: extract and normalize

use std::path::Path;

use colored::Colorize;

use asinopt::config::Config;
use asinopt::error::Result;
use asinopt::extract::ProductExtractionPipeline;
use asinopt::fetch::{HttpPageSource, PageSource, StaticPageSource};
use asinopt::listing::Asin;
use asinopt::normalize::normalize_with_strategy;

use crate::utils::read_input;

/// Extract product fields from a live or saved page
pub fn cmd_extract(asin: &str, file: Option<&Path>, json: bool) -> Result<()> {
    let asin = Asin::parse(asin)?;

    let source: Box<dyn PageSource> = match file {
        Some(path) => Box::new(StaticPageSource::from_file(path)?),
        None => Box::new(HttpPageSource::from_config(&Config::load()?)?),
    };
    let html = source.fetch(&asin)?;
    let details = ProductExtractionPipeline::amazon()?.run_html(&html, &asin)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }

    println!("\n{} {}\n", "Product".bold(), asin);
    println!("  Title:       {}", details.title);
    println!("  Price:       {}", details.price);
    println!("  Rating:      {}", details.rating);
    println!("  Image:       {}", details.image_url);

    if details.bullet_points.is_empty() {
        println!("  Bullets:     {}", "(none found)".dimmed());
    } else {
        println!("  Bullets:");
        for bullet in &details.bullet_points {
            println!("    - {}", bullet);
        }
    }

    if details.has_description() {
        println!("  Description:\n    {}", details.description);
    } else {
        println!("  Description: {}", details.description.dimmed());
    }
    println!();
    Ok(())
}

/// Shape raw model output into a listing and report the strategy that worked
pub fn cmd_normalize(file: Option<&Path>) -> Result<()> {
    let raw = read_input(file)?;
    let (listing, strategy) = normalize_with_strategy(&raw)?;

    let output = serde_json::json!({
        "strategy": strategy.label(),
        "listing": listing,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

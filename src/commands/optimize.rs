//! The optimize command: scrape, rewrite and save one listing

use colored::Colorize;

use asinopt::config::Config;
use asinopt::db::Database;
use asinopt::error::Result;
use asinopt::extract::ProductExtractionPipeline;
use asinopt::fetch::HttpPageSource;
use asinopt::listing::{Asin, OptimizedRecord};
use asinopt::model::{caller_from_config, ModelCaller, SyntheticModelCaller};
use asinopt::orchestrator::{OptimizationOrchestrator, Origin};

use crate::utils::time_ago;

/// Run the full pipeline for one ASIN and save the result
pub fn cmd_optimize(asin: &str, degraded: bool, offline: bool, json: bool) -> Result<()> {
    let asin = Asin::parse(asin)?;

    let mut config = Config::load()?;
    if degraded {
        config.degraded_mode = true;
    }

    let model: Box<dyn ModelCaller> = if offline {
        Box::new(SyntheticModelCaller)
    } else {
        caller_from_config(&config.model)
    };

    let db = Database::open()?;
    let previous = db.latest(&asin)?;

    let orchestrator = OptimizationOrchestrator::new(
        ProductExtractionPipeline::amazon()?,
        Box::new(HttpPageSource::from_config(&config)?),
        model,
        Box::new(db),
        config.degraded_mode,
    );

    if !json {
        println!("\nOptimizing {}...\n", asin);
        if let Some(previous) = &previous {
            println!(
                "  {}",
                format!(
                    "Previously optimized as #{} ({})",
                    previous.id,
                    time_ago(previous.created_at, chrono::Utc::now())
                )
                .dimmed()
            );
            println!();
        }
    }

    let record = orchestrator.optimize(asin.as_str())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    print_record(&record);
    Ok(())
}

fn print_record(record: &OptimizedRecord) {
    println!("  {}  {}", "Original:".bold(), record.original.title);
    println!("  {} {}", "Optimized:".bold(), record.optimized.optimized_title.green());
    println!();

    if !record.optimized.optimized_bullet_points.is_empty() {
        println!("  {}", "Bullet points".bold());
        for bullet in &record.optimized.optimized_bullet_points {
            println!("    - {}", bullet);
        }
        println!();
    }

    if !record.optimized.optimized_description.is_empty() {
        println!("  {}", "Description".bold());
        for line in record.optimized.optimized_description.lines() {
            println!("    {}", line);
        }
        println!();
    }

    if !record.optimized.keywords.is_empty() {
        println!("  {} {}", "Keywords:".bold(), record.optimized.keywords.join(", ").cyan());
        println!();
    }

    let provenance = &record.provenance;
    let origin = |origin: Origin| match origin {
        Origin::Genuine => "genuine".green(),
        Origin::Synthetic => "synthetic".yellow(),
    };
    println!(
        "  Source: product {}, listing {}{}",
        origin(provenance.product),
        origin(provenance.listing),
        provenance
            .strategy
            .map(|s| format!(" (parsed: {})", s.label()))
            .unwrap_or_default()
    );
    for degradation in &provenance.degradations {
        println!("    {} {}", "!".yellow(), degradation);
    }

    if let Some(id) = record.id {
        println!("\nSaved as #{}. Compare with: asinopt show {}", id, id);
    }
}

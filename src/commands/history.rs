//! Read path over saved optimizations: history and show

use colored::Colorize;

use asinopt::db::{Database, OptimizationRow};
use asinopt::diff::{compare_row, Segment};
use asinopt::error::{OptimizerError, Result};
use asinopt::listing::Asin;

use crate::utils::{time_ago, truncate_str};

/// List saved optimizations, optionally for one ASIN
pub fn cmd_history(asin: Option<&str>, limit: usize, json: bool) -> Result<()> {
    let db = Database::open()?;

    let rows = match asin {
        Some(asin) => {
            let asin = Asin::parse(asin)?;
            if !json && !db.asin_exists(&asin)? {
                println!("\nNo optimizations saved for {}.", asin);
                println!("Run `asinopt optimize {}` to create one.", asin);
                return Ok(());
            }
            let mut rows = db.history(&asin)?;
            rows.truncate(limit);
            rows
        }
        None => db.recent(limit)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("\nNo optimizations saved yet.");
        println!("Run `asinopt optimize <ASIN>` to create one.");
        return Ok(());
    }

    let now = chrono::Utc::now();
    println!("\n{} optimization(s):\n", rows.len());
    for row in &rows {
        println!(
            "  #{:<5} {}  {} ({})",
            row.id,
            row.asin.bold(),
            row.created_at.format("%Y-%m-%d %H:%M"),
            time_ago(row.created_at, now).dimmed()
        );
        println!("         {}", truncate_str(&row.optimized_title, 90));
    }
    println!();
    Ok(())
}

/// Show one saved optimization with a word-level comparison
pub fn cmd_show(id: i64, json: bool) -> Result<()> {
    let db = Database::open()?;
    let row = db.get(id)?.ok_or(OptimizerError::RecordNotFound(id))?;
    let comparison = compare_row(&row);

    if json {
        let output = serde_json::json!({
            "record": row,
            "comparison": comparison,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_header(&row);
    for field in &comparison {
        let summary = field.diff.summary.as_deref().unwrap_or("unchanged");
        println!(
            "  {} ({}, {:.0}% kept)",
            field.field.bold(),
            summary,
            field.diff.similarity * 100.0
        );
        print!("    ");
        for segment in &field.diff.segments {
            match segment {
                Segment::Kept(text) => print!("{}", text.replace('\n', "\n    ")),
                Segment::Removed(text) => print!("{}", text.replace('\n', "\n    ").red().strikethrough()),
                Segment::Added(text) => print!("{}", text.replace('\n', "\n    ").green()),
            }
        }
        println!("\n");
    }

    if !row.keywords.is_empty() {
        println!("  {} {}\n", "Keywords:".bold(), row.keywords.join(", ").cyan());
    }
    Ok(())
}

fn print_header(row: &OptimizationRow) {
    println!(
        "\nOptimization #{} for {} ({})\n",
        row.id,
        row.asin.bold(),
        row.created_at.format("%Y-%m-%d %H:%M")
    );
}

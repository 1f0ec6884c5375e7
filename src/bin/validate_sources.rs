//! Source Validation Binary
//!
//! Validates data/sources.yml before the scheduled run:
//! - Checks scraper types are supported
//! - Checks names and URLs are present and well-formed

use ai_tools_tracker::storage;
use ai_tools_tracker::validate::validate_sources;
use anyhow::{Context, Result};

fn main() -> Result<()> {
    let root = std::env::var("ROOT").unwrap_or_else(|_| ".".to_string());

    println!("=== Source Configuration Validator ===");

    let sources = storage::load_sources(&root).context("Failed to load sources.yml")?;
    let report = validate_sources(&sources);

    if report.is_clean() {
        println!("✓ All {} sources are valid", sources.sources.len());
        return Ok(());
    }

    if !report.errors.is_empty() {
        println!("\n❌ ERRORS (must fix):");
        for error in &report.errors {
            println!("  - {}", error);
        }
    }

    if !report.warnings.is_empty() {
        println!("\n⚠️  WARNINGS:");
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }

    if !report.errors.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}

//! Checks on `sources.yml` before a scheduled run

use regex::Regex;
use std::collections::HashSet;

use crate::scrapers::SUPPORTED_SCRAPERS;
use crate::types::Sources;

#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Problems that make a source unusable
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

pub fn validate_sources(sources: &Sources) -> ValidationReport {
    let mut report = ValidationReport::default();
    let url_pattern = Regex::new(r"^https?://[^\s/]+").ok();
    let mut seen_names = HashSet::new();

    for source in &sources.sources {
        if source.name.trim().is_empty() {
            report.errors.push(format!("Source with URL '{}' has empty name", source.url));
        } else if !seen_names.insert(source.name.as_str()) {
            report.warnings.push(format!("Source name '{}' is used more than once", source.name));
        }

        if !SUPPORTED_SCRAPERS.contains(&source.scraper.as_str()) {
            report.errors.push(format!(
                "Source '{}' has unsupported scraper type: '{}'. Supported types: {:?}",
                source.name, source.scraper, SUPPORTED_SCRAPERS
            ));
        }

        if source.url.trim().is_empty() {
            report.errors.push(format!("Source '{}' has empty URL", source.name));
        } else if let Some(ref pattern) = url_pattern {
            if !pattern.is_match(&source.url) {
                report.warnings.push(format!(
                    "Source '{}' has URL without http/https scheme: {}",
                    source.name, source.url
                ));
            }
        }
    }

    if !sources.sources.iter().any(|s| s.enabled) {
        report.warnings.push("No sources are enabled".to_string());
    }

    report
}

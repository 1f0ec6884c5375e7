//! The scheduled job: scrape, merge, publish
//!
//! Each step reads and writes the data root, so the steps can run as
//! separate invocations as well as one after the other.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::baseline::{load_baseline, BaselineSource};
use crate::notify::Notifier;
use crate::reconcile::{append_unseen, diff_new, reconcile};
use crate::scrapers;
use crate::storage::{self, TOOLS_CSV};
use crate::types::{FetchResult, Source, ToolRecord};

#[derive(Debug, Default)]
pub struct MergeSummary {
    pub persisted: usize,
    pub duplicates_removed: usize,
    pub undated: usize,
    pub new_tools: Vec<ToolRecord>,
}

/// Fetch every enabled source and append what is new.
///
/// A missing or unreadable `sources.yml` is logged and treated as no
/// sources, so a combined run still goes on to merge and publish.
pub fn scrape(root: &str) -> Result<usize> {
    let sources = match storage::load_sources(root) {
        Ok(sources) => sources,
        Err(e) => {
            warn!("Skipping scrape: {:#}", e);
            return Ok(0);
        }
    };
    let results = scrapers::fetch_enabled(&sources.sources);
    append_fetched(root, results)
}

/// Append fetched tools with unseen URLs to the dataset.
///
/// Returns the number of rows added. The file is only rewritten when
/// something was added.
pub fn append_fetched(root: &str, results: Vec<(Source, FetchResult)>) -> Result<usize> {
    let path = storage::tools_path(root);
    let existing = storage::load_tools(&path);

    let fetched: Vec<ToolRecord> = results.into_iter().flat_map(|(_, r)| r.tools).collect();
    if fetched.is_empty() {
        info!("No tools fetched; dataset unchanged");
        return Ok(0);
    }

    let (combined, added) = append_unseen(existing, fetched);
    if added == 0 {
        info!("All fetched tools already present");
        return Ok(0);
    }

    storage::save_tools(&path, &combined)
        .with_context(|| format!("Failed to save dataset to {:?}", path))?;
    info!("Appended {} new tools to {:?}", added, path);
    Ok(added)
}

/// Reconcile the dataset against the last committed version.
///
/// Writes the sorted, deduplicated dataset and the new-tools artifact.
/// Failing to write the dataset is the only error.
pub fn merge(root: &str, baseline_source: &dyn BaselineSource) -> Result<MergeSummary> {
    let current = storage::load_current_dataset(root);
    if current.is_empty() {
        warn!("No tools to write");
        storage::clear_new_tools(root);
        return Ok(MergeSummary::default());
    }

    let baseline = load_baseline(baseline_source, TOOLS_CSV);
    if !baseline.is_available() {
        info!("No previous dataset version; new-tool detection skipped");
    }

    let result = reconcile(current, &baseline);

    if result.new_records.is_empty() {
        info!("No new tools found");
        storage::clear_new_tools(root);
    } else {
        info!("Found {} new tools", result.new_records.len());
        if let Err(e) = storage::save_new_tools(root, &result.new_records) {
            warn!("Error saving new tools: {:#}", e);
        }
    }

    if result.duplicates_removed > 0 {
        info!("Removed {} duplicate rows", result.duplicates_removed);
    }
    if result.undated_count > 0 {
        info!("{} tools have no parsable launch date", result.undated_count);
    }

    let path = storage::tools_path(root);
    storage::save_tools(&path, &result.persisted)
        .with_context(|| format!("Failed to save dataset to {:?}", path))?;
    info!("Saved {} tools to {:?}", result.persisted.len(), path);

    Ok(MergeSummary {
        persisted: result.persisted.len(),
        duplicates_removed: result.duplicates_removed,
        undated: result.undated_count,
        new_tools: result.new_records,
    })
}

/// New tools to announce: the artifact left by `merge`, or a fresh diff
/// against the baseline when there is none.
pub fn pending_new_tools(root: &str, baseline_source: &dyn BaselineSource) -> Vec<ToolRecord> {
    let from_artifact = storage::load_new_tools(root);
    if !from_artifact.is_empty() {
        info!("Found {} new tools to alert about", from_artifact.len());
        return from_artifact;
    }

    let path: PathBuf = storage::tools_path(root);
    if !path.exists() {
        return vec![];
    }

    let current = storage::load_tools(&path);
    let baseline = load_baseline(baseline_source, TOOLS_CSV);
    let detected = diff_new(&current, &baseline);
    if !detected.is_empty() {
        info!("Detected {} new tools by comparing with the previous version", detected.len());
    }
    detected
}

/// Announce pending new tools and consume the artifact.
///
/// Returns whether any notification went out.
pub fn publish(root: &str, notifier: &dyn Notifier, baseline_source: &dyn BaselineSource) -> bool {
    let new_tools = pending_new_tools(root, baseline_source);
    if new_tools.is_empty() {
        info!("No new tools to alert about.");
        return false;
    }

    let sent = notifier.notify(&new_tools);
    storage::clear_new_tools(root);
    sent
}

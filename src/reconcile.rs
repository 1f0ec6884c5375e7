//! Dataset Reconciliation Module
//!
//! Merges freshly fetched tools into the persisted dataset:
//! - Detects tools that were not in the previous committed snapshot
//! - Deduplicates by URL, keeping the last occurrence
//! - Sorts by launch date (newest first, undated last)
//! - Fills in derivable fields such as `primary_category`

use crate::baseline::Baseline;
use crate::types::ToolRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Datetime layouts tried before falling back to date-only layouts
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// Output of a full reconciliation pass
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Deduplicated, sorted rows ready to be written
    pub persisted: Vec<ToolRecord>,
    /// Rows whose URL was not in the baseline
    pub new_records: Vec<ToolRecord>,
    pub input_count: usize,
    pub duplicates_removed: usize,
    pub undated_count: usize,
}

/// Parse a launch date in any of the layouts sources are known to emit.
///
/// Timezone-qualified values are converted to UTC. Returns `None` for empty
/// or unrecognised input.
pub fn parse_launch_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// First non-empty tag of a comma-joined category list
pub fn derive_primary_category(category: &str) -> String {
    category
        .split(',')
        .map(str::trim)
        .find(|tag| !tag.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Fill fields that can be derived from other fields of the same record
pub fn normalize_record(record: &mut ToolRecord) {
    if record.primary_category.trim().is_empty() {
        record.primary_category = derive_primary_category(&record.category);
    }
}

/// Records in `current` whose URL is absent from the baseline, in input order.
///
/// An unavailable baseline yields no new records: without a prior snapshot
/// every row would look new, so detection is skipped for that run.
pub fn diff_new(current: &[ToolRecord], baseline: &Baseline) -> Vec<ToolRecord> {
    let known: HashSet<&str> = match baseline {
        Baseline::Unavailable => return vec![],
        Baseline::Snapshot(records) => records.iter().map(|r| r.url.as_str()).collect(),
    };

    current
        .iter()
        .filter(|r| !known.contains(r.url.as_str()))
        .cloned()
        .collect()
}

/// Keep the last occurrence of each URL, normalize, and sort newest first.
///
/// Dated rows are rewritten as `YYYY-MM-DD`; rows whose date cannot be parsed
/// keep their raw value and follow all dated rows in their original order.
pub fn dedupe_and_sort(current: Vec<ToolRecord>) -> Vec<ToolRecord> {
    let mut last_index: HashMap<String, usize> = HashMap::new();
    for (i, record) in current.iter().enumerate() {
        last_index.insert(record.url.clone(), i);
    }

    let mut keyed: Vec<(Option<NaiveDateTime>, ToolRecord)> = current
        .into_iter()
        .enumerate()
        .filter(|(i, record)| last_index.get(&record.url) == Some(i))
        .map(|(_, mut record)| {
            normalize_record(&mut record);
            (parse_launch_date(&record.launch_date), record)
        })
        .collect();

    // sort_by is stable, so ties and undated rows keep their relative order
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    keyed
        .into_iter()
        .map(|(parsed, mut record)| {
            if let Some(dt) = parsed {
                record.launch_date = dt.format("%Y-%m-%d").to_string();
            }
            record
        })
        .collect()
}

/// Append fetched tools whose URL is not already in `existing`.
///
/// Returns the combined rows and how many were appended. Duplicates within
/// `fetched` itself are left for `dedupe_and_sort` to collapse.
pub fn append_unseen(existing: Vec<ToolRecord>, fetched: Vec<ToolRecord>) -> (Vec<ToolRecord>, usize) {
    let known: HashSet<String> = existing.iter().map(|r| r.url.clone()).collect();
    let mut combined = existing;
    let before = combined.len();

    combined.extend(fetched.into_iter().filter(|r| !known.contains(&r.url)));

    let added = combined.len() - before;
    (combined, added)
}

/// Run new-record detection and dedup/sort over one snapshot
pub fn reconcile(current: Vec<ToolRecord>, baseline: &Baseline) -> Reconciliation {
    let input_count = current.len();
    let new_records = diff_new(&current, baseline);
    let persisted = dedupe_and_sort(current);

    let undated_count = persisted
        .iter()
        .filter(|r| parse_launch_date(&r.launch_date).is_none())
        .count();

    Reconciliation {
        duplicates_removed: input_count - persisted.len(),
        input_count,
        undated_count,
        new_records,
        persisted,
    }
}

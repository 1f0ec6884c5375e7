//! Prior-snapshot lookup used for new-tool detection

use crate::storage;
use crate::types::ToolRecord;
use tracing::{info, warn};

/// The dataset as it stood before this run's fetches were merged in
#[derive(Debug, Clone)]
pub enum Baseline {
    /// No prior version could be obtained
    Unavailable,
    Snapshot(Vec<ToolRecord>),
}

impl Baseline {
    pub fn is_available(&self) -> bool {
        matches!(self, Baseline::Snapshot(_))
    }
}

/// Something that can hand back an earlier version of a file
pub trait BaselineSource {
    /// Raw bytes of `path` as of the prior version, or `None` when there is
    /// no such version.
    fn fetch_prior_version(&self, path: &str) -> Option<Vec<u8>>;
}

/// Fixed in-memory baseline, handy when the prior version is already known
impl BaselineSource for Option<Vec<u8>> {
    fn fetch_prior_version(&self, _path: &str) -> Option<Vec<u8>> {
        self.clone()
    }
}

/// Resolve the baseline for `path`, degrading to `Unavailable` on any failure
pub fn load_baseline(source: &dyn BaselineSource, path: &str) -> Baseline {
    let Some(bytes) = source.fetch_prior_version(path) else {
        info!("No prior version of {} found; new-tool detection skipped for this run", path);
        return Baseline::Unavailable;
    };

    match storage::parse_tools_csv(&bytes) {
        Ok(records) => {
            info!("Found {} tools in previous version of {}", records.len(), path);
            Baseline::Snapshot(records)
        }
        Err(e) => {
            warn!("Prior version of {} is unreadable ({}); new-tool detection skipped", path, e);
            Baseline::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_prior_version_is_unavailable() {
        let source: Option<Vec<u8>> = None;
        assert!(!load_baseline(&source, "data/tools.csv").is_available());
    }

    #[test]
    fn test_prior_version_is_parsed() {
        let source = Some(b"id,name,url\n1,One,https://one.example\n".to_vec());
        match load_baseline(&source, "data/tools.csv") {
            Baseline::Snapshot(records) => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].url, "https://one.example");
            }
            Baseline::Unavailable => panic!("expected a snapshot"),
        }
    }

    #[test]
    fn test_empty_prior_file_is_unavailable() {
        let source: Option<Vec<u8>> = Some(Vec::new());
        assert!(!load_baseline(&source, "data/tools.csv").is_available());
    }

    #[test]
    fn test_header_only_prior_file_is_an_empty_snapshot() {
        let source = Some(b"id,name,description,url\n".to_vec());
        match load_baseline(&source, "data/tools.csv") {
            Baseline::Snapshot(records) => assert!(records.is_empty()),
            Baseline::Unavailable => panic!("expected a snapshot"),
        }
    }
}

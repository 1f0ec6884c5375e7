pub mod github_trending;
pub mod producthunt;

use crate::types::{FetchResult, Source, SourceStatus};
use std::time::Duration;
use tracing::{info, warn};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Scraper names accepted in `sources.yml`
pub const SUPPORTED_SCRAPERS: &[&str] = &[github_trending::SCRAPER, producthunt::SCRAPER];

pub(crate) fn build_client() -> reqwest::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
}

/// Map a transport-level failure onto a source status
pub(crate) fn classify_request_error(e: &reqwest::Error) -> SourceStatus {
    if e.is_timeout() {
        SourceStatus::Timeout
    } else if e.is_decode() {
        SourceStatus::ParseError
    } else if e.is_redirect() || e.is_connect() || e.is_request() {
        SourceStatus::NetworkError
    } else {
        SourceStatus::Unknown
    }
}

/// True when any keyword occurs (case-insensitively) in any of `texts`
pub fn is_ai_related(keywords: &[&str], texts: &[&str]) -> bool {
    let lowered: Vec<String> = texts.iter().map(|t| t.to_lowercase()).collect();
    keywords
        .iter()
        .any(|kw| lowered.iter().any(|text| text.contains(kw)))
}

/// Fetch one configured source. Never fails; problems come back as a
/// non-ok `FetchResult`.
pub fn fetch_source(source: &Source) -> FetchResult {
    match source.scraper.as_str() {
        github_trending::SCRAPER => github_trending::fetch(&source.url),
        producthunt::SCRAPER => producthunt::fetch(&source.url),
        other => {
            warn!("Unknown scraper type: {}", other);
            FetchResult::skipped(format!("unknown scraper '{}'", other))
        }
    }
}

/// Fetch every enabled source in order
pub fn fetch_enabled(sources: &[Source]) -> Vec<(Source, FetchResult)> {
    sources
        .iter()
        .filter(|s| s.enabled)
        .map(|source| {
            info!("Fetching: {} ({})", source.name, source.url);
            let result = fetch_source(source);
            if result.is_ok() {
                info!("  {} tools from {}", result.tools.len(), source.name);
            } else {
                warn!(
                    "  {} returned {}{}",
                    source.name,
                    result.status,
                    result.error_message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default()
                );
            }
            (source.clone(), result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_ai_related_case_insensitive() {
        assert!(is_ai_related(&["llm"], &["Tiny LLM runtime"]));
        assert!(is_ai_related(&["neural"], &["", "A Neural net"]));
        assert!(!is_ai_related(&["pytorch"], &["Static site generator"]));
    }

    #[test]
    fn test_unknown_scraper_is_skipped() {
        let source = Source {
            name: "Mystery".to_string(),
            source_type: "other".to_string(),
            url: "https://example.com".to_string(),
            enabled: true,
            scraper: "selenium".to_string(),
        };
        let result = fetch_source(&source);
        assert_eq!(result.status, SourceStatus::Skipped);
        assert!(result.tools.is_empty());
    }

    #[test]
    fn test_disabled_sources_are_not_fetched() {
        let source = Source {
            name: "Off".to_string(),
            source_type: "other".to_string(),
            url: "http://127.0.0.1:9/never".to_string(),
            enabled: false,
            scraper: github_trending::SCRAPER.to_string(),
        };
        assert!(fetch_enabled(&[source]).is_empty());
    }
}

use crate::reconcile::derive_primary_category;
use crate::types::{FetchResult, SourceStatus, ToolRecord};
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{build_client, classify_request_error, is_ai_related};

pub const SCRAPER: &str = "github_trending";
pub const SOURCE_TAG: &str = "github-trending";

const MAX_ITEMS: usize = 25;
const COURTESY_DELAY: Duration = Duration::from_secs(1);

const AI_KEYWORDS: &[&str] = &[
    "ai", "artificial intelligence", "machine learning", "ml", "deep learning",
    "neural", "nlp", "llm", "gpt", "transformer", "pytorch", "tensorflow",
    "chatbot", "computer vision", "cv", "reinforcement learning",
];

/// Scrape the GitHub Trending page for AI/ML repositories
pub fn fetch(url: &str) -> FetchResult {
    fetch_with_delay(url, COURTESY_DELAY)
}

pub(crate) fn fetch_with_delay(url: &str, delay: Duration) -> FetchResult {
    let client = match build_client() {
        Ok(client) => client,
        Err(e) => return FetchResult::failed(SourceStatus::NetworkError, None, e.to_string()),
    };

    let response = match client.get(url).send() {
        Ok(resp) => resp,
        Err(e) => {
            warn!("Error fetching GitHub Trending: {}", e);
            return FetchResult::failed(classify_request_error(&e), None, e.to_string());
        }
    };

    let status_code = response.status().as_u16();
    if !response.status().is_success() {
        warn!("GitHub Trending returned status {}", status_code);
        return FetchResult::failed(
            SourceStatus::from_http_code(status_code),
            Some(status_code),
            format!("HTTP {}", status_code),
        );
    }

    let html = match response.text() {
        Ok(html) => html,
        Err(e) => {
            return FetchResult::failed(SourceStatus::ParseError, Some(status_code), e.to_string());
        }
    };

    let fetched_at = Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string();
    let tools = parse_trending_html(&html, &fetched_at);
    info!("Found {} AI/ML repositories from GitHub Trending", tools.len());

    if !delay.is_zero() {
        std::thread::sleep(delay);
    }

    FetchResult::ok(tools, Some(status_code))
}

/// Extract AI-related repositories from a trending page.
///
/// `fetched_at` becomes every record's launch date; the page carries no
/// per-repository date.
pub fn parse_trending_html(html: &str, fetched_at: &str) -> Vec<ToolRecord> {
    let document = Html::parse_document(html);

    let mut items = select_all(&document, "article[class*='Box-row']");
    if items.is_empty() {
        items = select_all(&document, "h2[class*='h3']");
    }
    debug!("Found {} repository items", items.len());

    items
        .into_iter()
        .take(MAX_ITEMS)
        .filter_map(|item| parse_item(&item, fetched_at))
        .collect()
}

fn select_all<'a>(document: &'a Html, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(sel) => document.select(&sel).collect(),
        Err(_) => vec![],
    }
}

fn first_match<'a>(element: &ElementRef<'a>, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|s| {
        Selector::parse(s)
            .ok()
            .and_then(|sel| element.select(&sel).next())
    })
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_item(item: &ElementRef, fetched_at: &str) -> Option<ToolRecord> {
    // The heading link is the repository; other links are star/sponsor buttons
    let link = first_match(item, &["h2 a[href]", "a[href]"])?;
    let repo_path = link.value().attr("href")?.trim();
    let repo_name = repo_path.trim_matches('/');
    if repo_name.is_empty() {
        return None;
    }

    let description = match first_match(item, &["p[class*='col-9']", "p"]) {
        Some(p) => {
            let text = element_text(&p);
            if text.is_empty() {
                "GitHub repository".to_string()
            } else {
                text
            }
        }
        None => "No description".to_string(),
    };

    if !is_ai_related(AI_KEYWORDS, &[repo_name, &description]) {
        return None;
    }

    let category = "devtools,github".to_string();
    Some(ToolRecord {
        id: format!("github-{}", repo_name.replace('/', "-")),
        name: repo_name.to_string(),
        description,
        url: format!("https://github.com/{}", repo_name),
        primary_category: derive_primary_category(&category),
        category,
        source: SOURCE_TAG.to_string(),
        launch_date: fetched_at.to_string(),
    })
}

use crate::reconcile::derive_primary_category;
use crate::types::{FetchResult, SourceStatus, ToolRecord};
use chrono::Utc;
use serde::Deserialize;
use std::env;
use tracing::{info, warn};

use super::{build_client, classify_request_error, is_ai_related};

pub const SCRAPER: &str = "producthunt";
pub const SOURCE_TAG: &str = "producthunt";
pub const API_KEY_VAR: &str = "PRODUCTHUNT_API_KEY";

const POSTS_QUERY: &str = r#"
query {
    posts(first: 50, order: VOTES) {
        edges {
            node {
                id
                name
                tagline
                url
                website
                topics { edges { node { name } } }
                createdAt
            }
        }
    }
}
"#;

const AI_KEYWORDS: &[&str] = &[
    "ai", "artificial intelligence", "machine learning", "ml", "nlp", "neural", "deep learning",
];

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    posts: Option<Connection<Post>>,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Post {
    id: Option<String>,
    name: Option<String>,
    tagline: Option<String>,
    url: Option<String>,
    website: Option<String>,
    topics: Option<Connection<Topic>>,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Topic {
    name: String,
}

/// Query the Product Hunt API at `endpoint`, authenticating with
/// `PRODUCTHUNT_API_KEY`. Without a key the source is skipped.
pub fn fetch(endpoint: &str) -> FetchResult {
    let key = env::var(API_KEY_VAR).ok().filter(|k| !k.trim().is_empty());
    fetch_with_key(endpoint, key.as_deref())
}

pub(crate) fn fetch_with_key(endpoint: &str, api_key: Option<&str>) -> FetchResult {
    let Some(api_key) = api_key else {
        info!("{} not found. Skipping Product Hunt scraping.", API_KEY_VAR);
        return FetchResult::skipped(format!("{} not set", API_KEY_VAR));
    };

    let client = match build_client() {
        Ok(client) => client,
        Err(e) => return FetchResult::failed(SourceStatus::NetworkError, None, e.to_string()),
    };

    let response = match client
        .post(endpoint)
        .bearer_auth(api_key)
        .json(&serde_json::json!({ "query": POSTS_QUERY }))
        .send()
    {
        Ok(resp) => resp,
        Err(e) => {
            warn!("Error querying Product Hunt: {}", e);
            return FetchResult::failed(classify_request_error(&e), None, e.to_string());
        }
    };

    let status_code = response.status().as_u16();
    if !response.status().is_success() {
        let body = response.text().unwrap_or_default();
        let excerpt: String = body.chars().take(200).collect();
        warn!("Product Hunt API error: {} {}", status_code, excerpt);
        return FetchResult::failed(
            SourceStatus::from_http_code(status_code),
            Some(status_code),
            format!("HTTP {}", status_code),
        );
    }

    let body = match response.text() {
        Ok(body) => body,
        Err(e) => {
            return FetchResult::failed(SourceStatus::ParseError, Some(status_code), e.to_string());
        }
    };

    match parse_posts(&body) {
        Ok(tools) => {
            info!("Found {} AI tools from Product Hunt", tools.len());
            FetchResult::ok(tools, Some(status_code))
        }
        Err(message) => {
            warn!("Product Hunt response rejected: {}", message);
            FetchResult::failed(SourceStatus::ParseError, Some(status_code), message)
        }
    }
}

/// Turn a GraphQL `posts` response body into AI-related tool records.
///
/// A response carrying `errors` is rejected as a whole.
pub fn parse_posts(body: &str) -> Result<Vec<ToolRecord>, String> {
    let response: GraphQlResponse =
        serde_json::from_str(body).map_err(|e| format!("invalid JSON: {}", e))?;

    if let Some(errors) = response.errors {
        return Err(format!("GraphQL errors: {}", errors));
    }

    let edges = response
        .data
        .and_then(|d| d.posts)
        .map(|p| p.edges)
        .unwrap_or_default();

    Ok(edges.into_iter().filter_map(|edge| post_to_record(edge.node)).collect())
}

fn post_to_record(post: Post) -> Option<ToolRecord> {
    let topics: Vec<String> = post
        .topics
        .map(|t| t.edges.into_iter().map(|e| e.node.name).collect())
        .unwrap_or_default();

    let name = post.name.unwrap_or_default();
    let tagline = post.tagline.unwrap_or_default();
    let joined_topics = topics.join(" ");
    if !is_ai_related(AI_KEYWORDS, &[&name, &tagline, &joined_topics]) {
        return None;
    }

    let category = map_category(topics.first().map(String::as_str));
    let url = post
        .website
        .filter(|w| !w.is_empty())
        .or(post.url)
        .unwrap_or_default();
    let launch_date = post
        .created_at
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string());

    Some(ToolRecord {
        id: post.id.unwrap_or_default(),
        name,
        description: tagline,
        url,
        primary_category: derive_primary_category(&category),
        category,
        source: SOURCE_TAG.to_string(),
        launch_date,
    })
}

/// Slug the first topic and fold well-known topics onto dataset categories
fn map_category(first_topic: Option<&str>) -> String {
    let Some(topic) = first_topic else {
        return "general".to_string();
    };
    let slug = topic.to_lowercase().replace(' ', "-");
    match slug.as_str() {
        "fintech" => "finance".to_string(),
        "developer-tools" => "devtools".to_string(),
        "content-marketing" => "content".to_string(),
        _ => slug,
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column order of the persisted dataset.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "id",
    "name",
    "description",
    "url",
    "category",
    "primary_category",
    "source",
    "launch_date",
];

/// One row of the tools dataset.
///
/// Every field is always present; sources that do not know a value leave it
/// as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub url: String,
    pub category: String,
    pub primary_category: String,
    pub source: String,
    pub launch_date: String,
}

impl ToolRecord {
    /// Field values in `REQUIRED_COLUMNS` order.
    pub fn to_row(&self) -> [&str; 8] {
        [
            &self.id,
            &self.name,
            &self.description,
            &self.url,
            &self.category,
            &self.primary_category,
            &self.source,
            &self.launch_date,
        ]
    }

    /// Mutable access to a field by column name.
    pub fn field_mut(&mut self, column: &str) -> Option<&mut String> {
        match column {
            "id" => Some(&mut self.id),
            "name" => Some(&mut self.name),
            "description" => Some(&mut self.description),
            "url" => Some(&mut self.url),
            "category" => Some(&mut self.category),
            "primary_category" => Some(&mut self.primary_category),
            "source" => Some(&mut self.source),
            "launch_date" => Some(&mut self.launch_date),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Sources {
    pub sources: Vec<Source>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Source {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub url: String,
    pub enabled: bool,
    pub scraper: String,
}

/// Outcome of a single source fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    Skipped,
    NotFound,
    Forbidden,
    RateLimited,
    ServerError,
    Timeout,
    NetworkError,
    ParseError,
    Unknown,
}

impl SourceStatus {
    pub fn from_http_code(code: u16) -> Self {
        match code {
            200..=299 => SourceStatus::Ok,
            404 => SourceStatus::NotFound,
            403 => SourceStatus::Forbidden,
            429 => SourceStatus::RateLimited,
            500..=599 => SourceStatus::ServerError,
            _ => SourceStatus::Unknown,
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceStatus::Ok => "ok",
            SourceStatus::Skipped => "skipped",
            SourceStatus::NotFound => "not_found",
            SourceStatus::Forbidden => "forbidden",
            SourceStatus::RateLimited => "rate_limited",
            SourceStatus::ServerError => "server_error",
            SourceStatus::Timeout => "timeout",
            SourceStatus::NetworkError => "network_error",
            SourceStatus::ParseError => "parse_error",
            SourceStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// What a fetch collaborator hands back: the tools it found plus enough
/// detail to explain an empty result.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub tools: Vec<ToolRecord>,
    pub status: SourceStatus,
    pub http_code: Option<u16>,
    pub error_message: Option<String>,
}

impl FetchResult {
    pub fn ok(tools: Vec<ToolRecord>, http_code: Option<u16>) -> Self {
        Self {
            tools,
            status: SourceStatus::Ok,
            http_code,
            error_message: None,
        }
    }

    pub fn failed(status: SourceStatus, http_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            tools: vec![],
            status,
            http_code,
            error_message: Some(message.into()),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::failed(SourceStatus::Skipped, None, reason)
    }

    pub fn is_ok(&self) -> bool {
        self.status == SourceStatus::Ok
    }
}

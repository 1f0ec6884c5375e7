//! Chat-style search over the dataset

use crate::reconcile::parse_launch_date;
use crate::types::ToolRecord;

/// Categories offered for filtering, in detection order
pub const CATEGORIES: &[&str] = &[
    "finance",
    "customer-support",
    "content",
    "devtools",
    "marketing",
    "productivity",
];

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("finance", &["finance", "financial", "money", "banking", "investment"]),
    ("customer-support", &["support", "customer", "service", "helpdesk", "chatbot"]),
    ("content", &["content", "writing", "blog", "article", "copy"]),
    ("devtools", &["development", "code", "programming", "developer", "api"]),
    ("marketing", &["marketing", "social", "advertising", "campaign"]),
    ("productivity", &["productivity", "task", "project", "management", "workflow"]),
];

const NO_RESULTS: &str = "No tools found matching your criteria.";

/// First category whose keywords appear in the prompt
pub fn detect_category(prompt: &str) -> Option<&'static str> {
    let lowered = prompt.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
        .map(|(category, _)| *category)
}

/// Canonical name of a filter category, matched case-insensitively
pub fn known_category(name: &str) -> Option<&'static str> {
    let name = name.trim();
    CATEGORIES.iter().copied().find(|c| c.eq_ignore_ascii_case(name))
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Records whose category contains `category` and whose name or
/// description contains `query`, both case-insensitively. Blank filters
/// match everything.
pub fn filter_tools<'a>(
    records: &'a [ToolRecord],
    category: Option<&str>,
    query: Option<&str>,
) -> Vec<&'a ToolRecord> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    let query = query.map(str::trim).filter(|q| !q.is_empty());

    records
        .iter()
        .filter(|r| category.map_or(true, |c| contains_ci(&r.category, c)))
        .filter(|r| {
            query.map_or(true, |q| contains_ci(&r.name, q) || contains_ci(&r.description, q))
        })
        .collect()
}

fn category_or_general(record: &ToolRecord) -> &str {
    if record.category.trim().is_empty() {
        "general"
    } else {
        &record.category
    }
}

/// Short template summary of a result set
pub fn summarize(records: &[&ToolRecord], question: &str) -> String {
    if records.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut categories: Vec<&str> = Vec::new();
    for record in records {
        let category = category_or_general(record);
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    categories.truncate(3);

    let top: Vec<&str> = records
        .iter()
        .take(3)
        .map(|r| if r.name.is_empty() { "Unknown" } else { r.name.as_str() })
        .collect();

    let question = question.trim();
    let purpose = if question.is_empty() {
        "various tasks".to_string()
    } else {
        question.to_lowercase()
    };

    format!(
        "Found {} AI tool(s) matching your query.\n\nCategories: {}\n\nTop recommendations:\n{}\n\nThese tools can help with: {}",
        records.len(),
        categories.join(", "),
        top.join(", "),
        purpose
    )
}

/// One result block for terminal output
pub fn format_tool(record: &ToolRecord) -> String {
    let name = if record.name.is_empty() { "Unknown Tool" } else { &record.name };
    let description = if record.description.is_empty() {
        "No description available"
    } else {
        &record.description
    };

    let mut out = format!("### {}\n", name);
    out.push_str(&format!("Description: {}\n", description));
    out.push_str(&format!("Category: {}\n", category_or_general(record)));
    if let Some(date) = parse_launch_date(&record.launch_date) {
        out.push_str(&format!("Launched: {}\n", date.format("%Y-%m-%d")));
    }
    if record.url.is_empty() {
        out.push_str("No URL available\n");
    } else {
        out.push_str(&format!("URL: {}\n", record.url));
    }
    let source = if record.source.is_empty() { "unknown" } else { &record.source };
    out.push_str(&format!("Source: {}\n", source));
    out
}

/// Everything shown in reply to one prompt
#[derive(Debug)]
pub struct Answer<'a> {
    pub category: Option<String>,
    pub results: Vec<&'a ToolRecord>,
    pub summary: String,
}

/// Answer a free-text prompt.
///
/// A category detected in the prompt wins over `default_category`; the
/// prompt itself is then matched against names and descriptions.
pub fn answer<'a>(records: &'a [ToolRecord], prompt: &str, default_category: Option<&str>) -> Answer<'a> {
    let category = detect_category(prompt)
        .map(str::to_string)
        .or_else(|| default_category.map(str::to_string));
    let results = filter_tools(records, category.as_deref(), Some(prompt));
    let summary = summarize(&results, prompt);
    Answer {
        category,
        results,
        summary,
    }
}

/// Full terminal rendering of an answer
pub fn render_answer(answer: &Answer) -> String {
    if answer.results.is_empty() {
        return "I couldn't find any tools matching your query. Try asking about a specific category like 'finance tools' or 'content creation tools'.\n".to_string();
    }

    let mut out = format!("{}\n\n---\nFound {} tool(s)\n\n", answer.summary, answer.results.len());
    for record in &answer.results {
        out.push_str(&format_tool(record));
        out.push('\n');
    }
    out
}

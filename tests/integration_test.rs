//! Integration tests for the AI tools pipeline
//! Runs scrape → merge → publish → search against a scratch data root, using
//! a fixture GitHub Trending page and the bundled sample dataset.

use ai_tools_tracker::notify::Notifier;
use ai_tools_tracker::pipeline;
use ai_tools_tracker::scrapers::github_trending::parse_trending_html;
use ai_tools_tracker::search;
use ai_tools_tracker::storage::{self, NEW_TOOLS_JSON, SAMPLE_CSV};
use ai_tools_tracker::types::{FetchResult, Source, ToolRecord};
use std::cell::RefCell;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

struct RecordingNotifier {
    received: RefCell<Vec<ToolRecord>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, new_tools: &[ToolRecord]) -> bool {
        self.received.borrow_mut().extend_from_slice(new_tools);
        true
    }
}

fn trending_source() -> Source {
    Source {
        name: "GitHub Trending".to_string(),
        source_type: "directory".to_string(),
        url: "https://github.com/trending".to_string(),
        enabled: true,
        scraper: "github_trending".to_string(),
    }
}

fn setup_root() -> (TempDir, String) {
    let dir = TempDir::new().expect("temp dir");
    let sample = fs::read("data/sample_ai_tools.csv").expect("Failed to read bundled sample");
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(dir.path().join(SAMPLE_CSV), sample).unwrap();
    let root = dir.path().to_string_lossy().to_string();
    (dir, root)
}

#[test]
fn test_full_pipeline_reports_only_fetched_tools() {
    let (dir, root) = setup_root();

    // First run: seeded from the sample, no committed version yet
    let first = pipeline::merge(&root, &None::<Vec<u8>>).unwrap();
    assert_eq!(first.persisted, 8);
    assert!(first.new_tools.is_empty(), "first run must not announce the whole dataset");
    let committed = fs::read(storage::tools_path(&root)).unwrap();

    let seeded = storage::load_tools(&storage::tools_path(&root));
    assert_eq!(seeded[0].name, "LedgerMind");
    assert_eq!(seeded.last().unwrap().name, "TranscribeKit");

    // Second run: scrape the fixture page and merge against the committed file
    let html = fs::read_to_string("tests/fixtures/github_trending.html")
        .expect("Failed to read github_trending.html");
    let fetched = parse_trending_html(&html, "2024-06-01T08:00:00");
    assert_eq!(fetched.len(), 2, "non-AI repositories are filtered out");

    let added = pipeline::append_fetched(
        &root,
        vec![(trending_source(), FetchResult::ok(fetched, Some(200)))],
    )
    .unwrap();
    assert_eq!(added, 2);

    let baseline = Some(committed);
    let second = pipeline::merge(&root, &baseline).unwrap();
    assert_eq!(second.persisted, 10);
    let new_names: Vec<&str> = second.new_tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(new_names, vec!["acme/llm-router", "south/writer"]);

    let saved = storage::load_tools(&storage::tools_path(&root));
    assert_eq!(saved[0].url, "https://github.com/acme/llm-router");
    assert_eq!(saved[0].launch_date, "2024-06-01");
    assert_eq!(saved[0].primary_category, "devtools");
    assert_eq!(saved[1].url, "https://github.com/south/writer");
    assert_eq!(saved.last().unwrap().launch_date, "");

    // Re-merging an already merged file leaves it byte-for-byte the same
    let before = fs::read(storage::tools_path(&root)).unwrap();
    pipeline::merge(&root, &baseline).unwrap();
    assert_eq!(before, fs::read(storage::tools_path(&root)).unwrap());

    // Publish hands the artifact to the notifier and consumes it
    let notifier = RecordingNotifier {
        received: RefCell::new(vec![]),
    };
    assert!(pipeline::publish(&root, &notifier, &baseline));
    assert_eq!(notifier.received.borrow().len(), 2);
    assert!(!dir.path().join(NEW_TOOLS_JSON).exists());
}

#[test]
fn test_search_over_merged_dataset() {
    let (_dir, root) = setup_root();

    // Before any merge the sample is served directly
    let records = storage::load_dataset_for_search(&root);
    assert_eq!(records.len(), 8);

    pipeline::merge(&root, &None::<Vec<u8>>).unwrap();
    let records = storage::load_dataset_for_search(&root);

    let reply = search::answer(&records, "blog", None);
    assert_eq!(reply.category.as_deref(), Some("content"));
    assert_eq!(reply.results.len(), 1);
    assert_eq!(reply.results[0].name, "DraftWise");

    let finance = search::filter_tools(&records, Some("finance"), None);
    assert_eq!(finance.len(), 2);
    let summary = search::summarize(&finance, "");
    assert!(summary.contains("Top recommendations:\nLedgerMind, Quantaforecast"));
}

#[test]
fn test_missing_data_files_degrade_to_empty() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_string_lossy().to_string();

    assert!(storage::load_dataset_for_search(&root).is_empty());
    assert_eq!(pipeline::append_fetched(&root, vec![]).unwrap(), 0);
    assert!(storage::load_sources(&root).is_err());
}

#[test]
fn test_run_without_sources_file_still_merges() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_string_lossy().to_string();
    storage::save_tools(
        &storage::tools_path(&root),
        &[
            ToolRecord {
                url: "https://dup.example".to_string(),
                launch_date: "2024-01-01".to_string(),
                ..Default::default()
            },
            ToolRecord {
                url: "https://dup.example".to_string(),
                launch_date: "2024-03-01".to_string(),
                ..Default::default()
            },
        ],
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_ai-tools"))
        .args(["--root", root.as_str(), "run", "--no-commit"])
        .env_remove("ROOT")
        .output()
        .expect("Failed to run ai-tools");

    assert!(
        output.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let saved = storage::load_tools(&storage::tools_path(&root));
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].launch_date, "2024-03-01");
}

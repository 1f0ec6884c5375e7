use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use tracing::{info, warn};

use crate::error::StorageError;
use crate::types::{Sources, ToolRecord, REQUIRED_COLUMNS};

/// Dataset path relative to the repository root; also the path handed to git
pub const TOOLS_CSV: &str = "data/tools.csv";
pub const SAMPLE_CSV: &str = "data/sample_ai_tools.csv";
pub const NEW_TOOLS_JSON: &str = "data/new_tools.json";
pub const SOURCES_YML: &str = "data/sources.yml";

pub fn tools_path(root: &str) -> PathBuf {
    PathBuf::from(root).join(TOOLS_CSV)
}

pub fn load_sources(root: &str) -> Result<Sources> {
    let path = PathBuf::from(root).join(SOURCES_YML);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read sources from {:?}", path))?;

    let sources: Sources = serde_yaml::from_str(&content)
        .with_context(|| "Failed to parse sources YAML")?;

    Ok(sources)
}

/// Parse dataset CSV bytes.
///
/// Columns are matched by header name, so missing columns come back as empty
/// strings and unknown columns are ignored. Bytes that are not UTF-8 become
/// replacement characters; only rows the CSV reader cannot split are skipped.
pub fn parse_tools_csv(bytes: &[u8]) -> Result<Vec<ToolRecord>, StorageError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(StorageError::EmptyData);
    }

    let columns: Vec<Option<&'static str>> = headers
        .iter()
        .map(|h| REQUIRED_COLUMNS.iter().copied().find(|c| *c == h.as_str()))
        .collect();

    let mut records = Vec::new();
    for (i, row) in reader.byte_records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                // +2: header line and 1-based numbering
                warn!("Skipping malformed dataset row {}: {}", i + 2, e);
                continue;
            }
        };

        let mut record = ToolRecord::default();
        for (value, column) in row.iter().zip(columns.iter().copied()) {
            if let Some(field) = column.and_then(|c| record.field_mut(c)) {
                *field = String::from_utf8_lossy(value).into_owned();
            }
        }
        records.push(record);
    }

    Ok(records)
}

/// Load a dataset file, treating a missing or unreadable file as empty
pub fn load_tools(path: &Path) -> Vec<ToolRecord> {
    if !path.exists() {
        info!("No dataset at {:?}", path);
        return vec![];
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Error reading {:?}: {}", path, e);
            return vec![];
        }
    };

    match parse_tools_csv(&bytes) {
        Ok(records) => {
            info!("Loaded {} tools from {:?}", records.len(), path);
            records
        }
        Err(e) => {
            warn!("Error parsing {:?}: {}", path, e);
            vec![]
        }
    }
}

/// Dataset to reconcile: the live file, seeded from the sample when empty
pub fn load_current_dataset(root: &str) -> Vec<ToolRecord> {
    let current = load_tools(&tools_path(root));
    if !current.is_empty() {
        return current;
    }

    let sample_path = PathBuf::from(root).join(SAMPLE_CSV);
    if !sample_path.exists() {
        return current;
    }

    let sample = load_tools(&sample_path);
    info!("Initialized from sample dataset: {} tools", sample.len());
    sample
}

/// Dataset to serve: the live file if present, otherwise the bundled sample
pub fn load_dataset_for_search(root: &str) -> Vec<ToolRecord> {
    let live = tools_path(root);
    let path = if live.exists() {
        live
    } else {
        PathBuf::from(root).join(SAMPLE_CSV)
    };

    if !path.exists() {
        warn!("Data file not found: {:?}", path);
        return vec![];
    }

    load_tools(&path)
}

/// Replace the dataset at `path` with `records`.
///
/// Writes a sibling temp file and renames it over the target, so a failed
/// write leaves the previous file as it was.
pub fn save_tools(path: &Path, records: &[ToolRecord]) -> Result<(), StorageError> {
    let write_err = |source: io::Error| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension("csv.tmp");
    if let Err(e) = write_csv(&tmp_path, records) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path).map_err(write_err)?;
    Ok(())
}

fn write_csv(path: &Path, records: &[ToolRecord]) -> Result<(), StorageError> {
    let file = File::create(path).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(REQUIRED_COLUMNS)?;
    for record in records {
        writer.write_record(record.to_row())?;
    }
    writer.flush()?;

    let file = writer
        .into_inner()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;
    Ok(())
}

/// Save the new-tools side artifact for the publish step
pub fn save_new_tools(root: &str, tools: &[ToolRecord]) -> Result<()> {
    let path = PathBuf::from(root).join(NEW_TOOLS_JSON);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .context("Failed to create data directory")?;
    }
    let json = serde_json::to_string_pretty(tools)?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write new tools to {:?}", path))?;
    Ok(())
}

pub fn load_new_tools(root: &str) -> Vec<ToolRecord> {
    let path = PathBuf::from(root).join(NEW_TOOLS_JSON);
    if !path.exists() {
        return vec![];
    }

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Error reading {:?}: {}", path, e);
            return vec![];
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!("Error parsing {:?}: {}", path, e);
        vec![]
    })
}

/// Remove the new-tools side artifact; a missing file is not an error
pub fn clear_new_tools(root: &str) {
    let path = PathBuf::from(root).join(NEW_TOOLS_JSON);
    if let Err(e) = fs::remove_file(&path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove {:?}: {}", path, e);
        }
    }
}

//! CSV exports: the found-offers log and the candidate trace dump.
//!
//! Both files are appended across runs. The header row is written only when
//! the file is new or empty.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

use pricewatch::{CandidateObserver, Offer, TraceEvent};

pub const FOUND_HEADER: [&str; 6] = ["product", "store", "title", "price_pln", "url", "found_at"];

pub const TRACE_HEADER: [&str; 12] = [
    "ts",
    "query",
    "url",
    "title",
    "domain",
    "passed_domain",
    "passed_url_regex",
    "fetched",
    "matched_pattern",
    "used_js",
    "price_pln",
    "filtered_out_reason",
];

/// Open `path` for appending, creating parent directories. The flag tells
/// whether a header is still needed.
fn open_append(path: &Path) -> Result<(File, bool)> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let needs_header = file.metadata().map(|m| m.len() == 0).unwrap_or(true);
    Ok((file, needs_header))
}

fn csv_writer(file: File) -> csv::Writer<File> {
    csv::WriterBuilder::new().has_headers(false).from_writer(file)
}

// ── Found offers ────────────────────────────────────────────────────

/// Appends priced offers to the found-offers CSV.
pub struct FoundCsv {
    path: PathBuf,
}

impl FoundCsv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row per priced offer. Returns the number of rows written.
    pub fn append(&self, product: &str, offers: &[Offer], found_at: &str) -> Result<usize> {
        let priced: Vec<(&Offer, f64)> = offers
            .iter()
            .filter_map(|o| o.price.map(|p| (o, p)))
            .collect();
        if priced.is_empty() {
            return Ok(0);
        }

        let (file, needs_header) = open_append(&self.path)?;
        let mut writer = csv_writer(file);
        if needs_header {
            writer.write_record(FOUND_HEADER)?;
        }
        for (offer, price) in &priced {
            writer.write_record([
                product,
                offer.store.as_str(),
                offer.title.as_str(),
                price.to_string().as_str(),
                offer.url.as_str(),
                found_at,
            ])?;
        }
        writer
            .flush()
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(priced.len())
    }
}

// ── Candidate trace dump ────────────────────────────────────────────

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "1",
        Some(false) => "0",
        None => "",
    }
}

/// Writes every cascade step as a CSV row.
pub struct DebugDump {
    path: PathBuf,
    writer: Mutex<csv::Writer<File>>,
}

impl DebugDump {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (file, needs_header) = open_append(&path)?;
        let mut writer = csv_writer(file);
        if needs_header {
            writer.write_record(TRACE_HEADER)?;
            writer.flush()?;
        }
        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: &TraceEvent) -> [String; 12] {
        [
            chrono::Utc::now().to_rfc3339(),
            event.query.clone(),
            event.url.clone(),
            event.title.clone(),
            event.domain.clone(),
            flag(event.passed_domain).to_string(),
            flag(event.passed_url_regex).to_string(),
            flag(Some(event.fetched)).to_string(),
            flag(event.matched_pattern).to_string(),
            flag(Some(event.used_js)).to_string(),
            event.price.map(|p| p.to_string()).unwrap_or_default(),
            event.reason().to_string(),
        ]
    }
}

impl CandidateObserver for DebugDump {
    fn observe(&self, event: &TraceEvent) {
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        let result = writer
            .write_record(Self::record(event))
            .and_then(|_| writer.flush().map_err(csv::Error::from));
        if let Err(e) = result {
            tracing::warn!("Debug dump write failed ({}): {e}", self.path.display());
        }
    }
}

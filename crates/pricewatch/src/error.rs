//! Error types for every stage of the offer pipeline.
//!
//! Only [`SearchError`] ever escapes a search run. Everything else is
//! absorbed by the cascade and turned into a rejection or a missing price.

use std::time::Duration;

use crate::types::CurrencyUnit;

/// A configured regular expression could not be compiled.
#[derive(thiserror::Error, Debug)]
#[error("invalid pattern {pattern:?}: {source}")]
pub struct ConfigError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Retrieving a candidate document failed.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

/// The headless engine could not produce rendered markup.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("Browser not available: {0}")]
    Unavailable(String),

    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    #[error("Content capture failed: {0}")]
    Capture(String),
}

/// A structured-data block held no parseable JSON.
#[derive(thiserror::Error, Debug)]
#[error("unparseable structured data block ({len} bytes)")]
pub struct ParseError {
    pub len: usize,
}

/// A price sample could not be expressed in the reference currency.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("no rate configured for {0:?}")]
    RateUnavailable(CurrencyUnit),

    #[error("unrecognized currency unit {0:?}")]
    UnrecognizedUnit(String),
}

/// The search provider could not be queried.
#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    #[error("Search credentials missing: {0}")]
    MissingCredentials(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search provider returned status {0}")]
    Status(u16),

    #[error("Invalid search response: {0}")]
    Decode(String),
}

/// Failure of a whole offer source for one query.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Unknown store: {0}")]
    UnknownStore(String),
}

//! Pricewatch agent: configuration, scheduled runs, offer history and CSV reports.

pub mod config;
pub mod export;
pub mod runner;
pub mod storage;
pub mod summary;

pub use config::{AgentConfig, ProductConfig, DEFAULT_CONFIG_PATH};
pub use export::{DebugDump, FoundCsv};
pub use runner::{build_registry, Agent, RunSummary, STORE_KEYS};
pub use storage::OfferStore;
pub use summary::OfferSummary;

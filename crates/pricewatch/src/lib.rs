//! Offer discovery pipeline: search candidates are filtered, fetched, rendered on demand and priced.

pub mod availability;
pub mod config;
pub mod currency;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod pipeline;
pub mod render;
pub mod search;
pub mod source;
pub mod trace;
pub mod types;

pub use config::{
    AvailabilitySettings, CurrencyRates, FilterContext, RenderPolicy, RenderSettings, WaitUntil,
    WebSearchSettings,
};
pub use dedup::dedup_by_url;
pub use error::{
    ConfigError, ConversionError, FetchError, ParseError, RenderError, SearchError, SourceError,
};
pub use extract::{ExtractorChain, PriceExtractor};
pub use fetch::{DocumentFetcher, HttpFetcher};
pub use pipeline::{CandidateOutcome, OfferPipeline, RunStats, SearchReport};
pub use render::{ChromiumRenderer, NoopRenderer, RenderBudget, RenderOptions, Renderer};
pub use search::{GoogleCseProvider, QueryOptions, SearchProvider};
pub use source::{OfferSource, SourceRegistry, WebSearchSource};
pub use trace::{CandidateObserver, TraceEvent, TraceLog, TraceStage};
pub use types::*;

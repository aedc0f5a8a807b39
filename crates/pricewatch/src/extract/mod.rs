//! Price extraction from fetched or rendered documents.
//!
//! Two extractors are chained: structured data (JSON-LD) first, then a
//! currency-aware text pattern as a last resort. Each returns the lowest
//! price it can convert into the reference currency.

pub mod pattern;
pub mod structured;

use crate::config::CurrencyRates;

pub use pattern::{extract_pattern_price, PatternExtractor};
pub use structured::{extract_structured_price, StructuredExtractor};

/// A strategy that turns document text into a reference-currency price.
pub trait PriceExtractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Lowest convertible price in the document, if any.
    fn extract(&self, document: &str, rates: &CurrencyRates) -> Option<f64>;
}

/// Ordered extractors; the first one producing a price wins.
pub struct ExtractorChain {
    extractors: Vec<Box<dyn PriceExtractor>>,
}

impl Default for ExtractorChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(StructuredExtractor),
            Box::new(PatternExtractor),
        ])
    }
}

impl ExtractorChain {
    pub fn new(extractors: Vec<Box<dyn PriceExtractor>>) -> Self {
        Self { extractors }
    }

    /// Run extractors in order and stop at the first price.
    pub fn price(&self, document: &str, rates: &CurrencyRates) -> Option<f64> {
        self.extractors.iter().find_map(|e| {
            let price = e.extract(document, rates);
            if let Some(p) = price {
                tracing::debug!("{} extractor found {p:.2}", e.name());
            }
            price
        })
    }
}

/// Minimum of already-validated prices.
pub(crate) fn lowest(prices: impl IntoIterator<Item = f64>) -> Option<f64> {
    prices.into_iter().fold(None, |acc, p| match acc {
        Some(min) if min <= p => Some(min),
        _ => Some(p),
    })
}

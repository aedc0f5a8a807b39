//! Last-resort price extraction: a numeral followed by a currency token.

use std::sync::OnceLock;

use regex::Regex;

use super::{lowest, PriceExtractor};
use crate::config::CurrencyRates;
use crate::currency::parse_amount;
use crate::types::PriceSample;

/// Up to five integer digits with optional thousands groups separated by a
/// space, a non-breaking space or nothing, an optional one- or two-digit
/// fraction after `,` or `.`, then a currency token. The euro sign is a
/// symbol, so it takes no trailing word boundary.
const PRICE_PATTERN: &str = r"(?i)(\d{1,5}(?:[ \x{a0}]?\d{3})*(?:[.,]\d{1,2})?)\s*(€|(?:zł|pln|eur|kč|kc|czk)\b)";

fn price_regex() -> &'static Regex {
    static PRICE_RE: OnceLock<Regex> = OnceLock::new();
    PRICE_RE.get_or_init(|| Regex::new(PRICE_PATTERN).expect("price regex is valid"))
}

/// Regex-based extractor over raw text.
pub struct PatternExtractor;

impl PriceExtractor for PatternExtractor {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn extract(&self, document: &str, rates: &CurrencyRates) -> Option<f64> {
        extract_pattern_price(document, rates)
    }
}

/// Every numeral + unit sample in the text, in order of appearance.
pub fn price_samples(text: &str) -> Vec<PriceSample> {
    price_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let value = parse_amount(caps.get(1)?.as_str())?;
            Some(PriceSample::new(value, caps.get(2)?.as_str()))
        })
        .collect()
}

/// Lowest convertible price quoted anywhere in the text.
pub fn extract_pattern_price(text: &str, rates: &CurrencyRates) -> Option<f64> {
    lowest(
        price_samples(text)
            .iter()
            .filter_map(|s| rates.convert(s).ok()),
    )
}

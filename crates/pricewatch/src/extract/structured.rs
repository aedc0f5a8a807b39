//! Price extraction from embedded JSON-LD product/offer markup.
//!
//! Every `<script type="application/ld+json">` block is parsed and walked
//! depth-first. Product, Offer and AggregateOffer nodes contribute a price;
//! the lowest convertible one across the whole page is returned.

use scraper::{Html, Selector};
use serde_json::{Map, Value};

use super::{lowest, PriceExtractor};
use crate::config::CurrencyRates;
use crate::currency::parse_amount;
use crate::error::ParseError;
use crate::types::PriceSample;

/// Price fields in order of preference.
const PRICE_KEYS: [&str; 3] = ["price", "lowPrice", "highPrice"];

/// Type-tag fragments marking a node that may carry a price.
const OFFER_TYPES: [&str; 3] = ["product", "offer", "aggregateoffer"];

/// JSON-LD extractor.
pub struct StructuredExtractor;

impl PriceExtractor for StructuredExtractor {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn extract(&self, document: &str, rates: &CurrencyRates) -> Option<f64> {
        extract_structured_price(document, rates)
    }
}

/// Lowest reference-currency price found in the document's JSON-LD blocks.
pub fn extract_structured_price(document: &str, rates: &CurrencyRates) -> Option<f64> {
    let mut prices = Vec::new();
    for block in jsonld_blocks(document) {
        match parse_block(&block) {
            Ok(values) => {
                for value in &values {
                    collect_prices(value, rates, &mut prices);
                }
            }
            Err(e) => tracing::debug!("Skipping JSON-LD block: {e}"),
        }
    }
    lowest(prices)
}

/// Raw, trimmed, non-empty JSON-LD block contents in document order.
pub fn jsonld_blocks(document: &str) -> Vec<String> {
    let html = Html::parse_document(document);
    let sel = Selector::parse(r#"script[type="application/ld+json"]"#)
        .expect("JSON-LD selector is valid");
    html.select(&sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}

/// Parse a block as one JSON value, or failing that, one value per line.
///
/// Some storefronts concatenate several JSON documents in a single script
/// tag. Lines that do not parse on their own are dropped.
pub fn parse_block(block: &str) -> Result<Vec<Value>, ParseError> {
    if let Ok(value) = serde_json::from_str::<Value>(block) {
        return Ok(vec![value]);
    }
    let values: Vec<Value> = block
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    if values.is_empty() {
        Err(ParseError { len: block.len() })
    } else {
        Ok(values)
    }
}

fn collect_prices(root: &Value, rates: &CurrencyRates, prices: &mut Vec<f64>) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node {
            Value::Object(map) => {
                // A priced node with nested offers is a container; its offers
                // are reached through the generic descent below.
                if is_offer_node(map) && !map.contains_key("offers") {
                    if let Some(price) = read_price(map, rates) {
                        prices.push(price);
                    }
                }
                stack.extend(map.values().filter(|v| is_container(v)));
            }
            Value::Array(items) => stack.extend(items.iter().filter(|v| is_container(v))),
            _ => {}
        }
    }
}

fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

fn type_tag(map: &Map<String, Value>) -> String {
    let tag = map
        .get("@type")
        .filter(|v| is_present(v))
        .or_else(|| map.get("type"));
    match tag {
        Some(Value::String(s)) => s.to_lowercase(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
        _ => String::new(),
    }
}

fn is_offer_node(map: &Map<String, Value>) -> bool {
    let tag = type_tag(map);
    OFFER_TYPES.iter().any(|t| tag.contains(t))
}

/// Null, empty strings, zero and `false` count as absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        _ => true,
    }
}

fn read_price(map: &Map<String, Value>, rates: &CurrencyRates) -> Option<f64> {
    let raw = PRICE_KEYS
        .iter()
        .filter_map(|k| map.get(*k))
        .find(|v| is_present(v))?;
    let value = match raw {
        Value::String(s) => parse_amount(s),
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite() && *f > 0.0),
        _ => None,
    }?;

    let currency = map
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("priceCurrency"))
        .and_then(|(_, v)| v.as_str())
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let sample = match currency {
        Some(token) => PriceSample::new(value, token),
        None => PriceSample::reference(value),
    };
    match rates.convert(&sample) {
        Ok(pln) => Some(pln),
        Err(e) => {
            tracing::debug!("Dropping JSON-LD price {value}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(blocks: &[&str]) -> String {
        let scripts: String = blocks
            .iter()
            .map(|b| format!(r#"<script type="application/ld+json">{b}</script>"#))
            .collect();
        format!("<html><head>{scripts}</head><body></body></html>")
    }

    #[test]
    fn test_lowest_of_multiple_offers() {
        let html = page(&[r#"
            {"@type": "Product", "name": "Kamera", "offers": [
                {"@type": "Offer", "price": "199.99", "priceCurrency": "PLN"},
                {"@type": "Offer", "price": 149.50, "priceCurrency": "PLN"}
            ]}"#]);
        assert_eq!(
            extract_structured_price(&html, &CurrencyRates::default()),
            Some(149.50)
        );
    }

    #[test]
    fn test_aggregate_offer_low_price() {
        let html = page(&[r#"
            {"@context": "https://schema.org", "@type": "Product",
             "offers": {"@type": "AggregateOffer", "lowPrice": "89,90", "highPrice": "120", "priceCurrency": "PLN"}}"#]);
        assert_eq!(
            extract_structured_price(&html, &CurrencyRates::default()),
            Some(89.90)
        );
    }

    #[test]
    fn test_missing_currency_is_reference() {
        let html = page(&[r#"{"@type": "Offer", "price": 55}"#]);
        assert_eq!(
            extract_structured_price(&html, &CurrencyRates::default()),
            Some(55.0)
        );
    }

    #[test]
    fn test_foreign_currency_without_rate_dropped() {
        let html = page(&[r#"
            {"@type": "Product", "offers": [
                {"@type": "Offer", "price": "10", "priceCurrency": "EUR"},
                {"@type": "Offer", "price": "300", "pricecurrency": "pln"}
            ]}"#]);
        assert_eq!(
            extract_structured_price(&html, &CurrencyRates::default()),
            Some(300.0)
        );

        let rates = CurrencyRates {
            parse_eur: true,
            eur_to_pln: Some(4.3),
            ..Default::default()
        };
        let pln = extract_structured_price(&html, &rates).unwrap();
        assert!((pln - 43.0).abs() < 1e-9);
    }

    #[test]
    fn test_graph_and_deep_nesting() {
        let html = page(&[r#"
            {"@context": "https://schema.org", "@graph": [
                {"@type": "WebPage", "name": "x"},
                {"@type": "ItemList", "itemListElement": [
                    {"item": {"@type": ["Product", "Thing"], "offers": {"@type": "Offer", "price": "420"}}}
                ]}
            ]}"#]);
        assert_eq!(
            extract_structured_price(&html, &CurrencyRates::default()),
            Some(420.0)
        );
    }

    #[test]
    fn test_concatenated_block_recovered_line_by_line() {
        let block = "{\"@type\": \"Offer\", \"price\": \"250\"}\n{not json}\n{\"@type\": \"Offer\", \"price\": \"240\"}";
        let values = parse_block(block).unwrap();
        assert_eq!(values.len(), 2);

        let html = page(&[block]);
        assert_eq!(
            extract_structured_price(&html, &CurrencyRates::default()),
            Some(240.0)
        );
    }

    #[test]
    fn test_malformed_block_skipped() {
        assert!(parse_block("{not valid json}").is_err());
        let html = page(&["{not valid json}", r#"{"@type": "Offer", "price": "12.5"}"#]);
        assert_eq!(
            extract_structured_price(&html, &CurrencyRates::default()),
            Some(12.5)
        );
    }

    #[test]
    fn test_zero_price_falls_through_to_low_price() {
        let html = page(&[r#"{"@type": "AggregateOffer", "price": 0, "lowPrice": "99"}"#]);
        assert_eq!(
            extract_structured_price(&html, &CurrencyRates::default()),
            Some(99.0)
        );
    }

    #[test]
    fn test_no_structured_data() {
        let html = "<html><body><p>199 zł</p></body></html>";
        assert_eq!(
            extract_structured_price(html, &CurrencyRates::default()),
            None
        );
    }
}

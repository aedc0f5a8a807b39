//! Conversion of price samples into the reference currency (PLN).

use crate::config::CurrencyRates;
use crate::error::ConversionError;
use crate::types::{CurrencyUnit, PriceSample};

impl CurrencyRates {
    /// Rate for a foreign unit, if parsing it is enabled and a positive,
    /// finite rate is configured.
    pub fn rate_for(&self, unit: CurrencyUnit) -> Option<f64> {
        let (enabled, rate) = match unit {
            CurrencyUnit::Reference => return Some(1.0),
            CurrencyUnit::Euro => (self.parse_eur, self.eur_to_pln),
            CurrencyUnit::CzechCrown => (self.parse_czk, self.czk_to_pln),
            CurrencyUnit::Unrecognized => return None,
        };
        rate.filter(|r| enabled && r.is_finite() && *r > 0.0)
    }

    /// Convert a sample into the reference currency.
    ///
    /// A missing rate is an error, never a pass-through of the raw value.
    pub fn convert(&self, sample: &PriceSample) -> Result<f64, ConversionError> {
        match sample.unit {
            CurrencyUnit::Reference => Ok(sample.value),
            CurrencyUnit::Unrecognized => {
                Err(ConversionError::UnrecognizedUnit(sample.token.clone()))
            }
            unit => self
                .rate_for(unit)
                .map(|rate| sample.value * rate)
                .ok_or(ConversionError::RateUnavailable(unit)),
        }
    }
}

/// Parse a price numeral such as `1 299,00` or `149.99`.
///
/// Space and non-breaking-space separators are stripped and a decimal
/// comma becomes a period. Only finite positive values are returned.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

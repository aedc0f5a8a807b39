//! Core data types flowing through the offer pipeline.

use serde::{Deserialize, Serialize};

/// Store tag carried by offers found through open web search.
pub const WEB_STORE: &str = "web";

/// One raw search result before any filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    pub title: String,
}

impl Candidate {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// An accepted candidate, priced or not.
///
/// `price` is in the reference currency and is either a finite positive
/// number or `None`. Zero is never used as a sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub store: String,
    pub title: String,
    pub url: String,
    pub price: Option<f64>,
}

/// Currency unit recognized next to a number or in `priceCurrency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyUnit {
    /// Polish złoty, the reference currency.
    Reference,
    Euro,
    CzechCrown,
    Unrecognized,
}

impl CurrencyUnit {
    /// Classify a unit token such as `zł`, `EUR`, `€` or `Kč`.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "zł" | "pln" => Self::Reference,
            "€" | "eur" => Self::Euro,
            "kč" | "kc" | "czk" => Self::CzechCrown,
            _ => Self::Unrecognized,
        }
    }
}

/// A number paired with the unit it was quoted in.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSample {
    pub value: f64,
    pub unit: CurrencyUnit,
    /// Token as it appeared in the document, kept for diagnostics.
    pub token: String,
}

impl PriceSample {
    pub fn new(value: f64, token: &str) -> Self {
        Self {
            value,
            unit: CurrencyUnit::from_token(token),
            token: token.to_string(),
        }
    }

    /// A sample already expressed in the reference currency.
    pub fn reference(value: f64) -> Self {
        Self {
            value,
            unit: CurrencyUnit::Reference,
            token: String::new(),
        }
    }
}

/// Why a candidate left the cascade without becoming an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    DomainNotAllowed,
    DomainDenied,
    PathNotAllowed,
    PathDenied,
    FetchError,
    OutOfStock,
    PatternNoMatch,
}

impl RejectReason {
    /// Coarse category: `domain`, `path`, `fetch_error`, `out_of_stock`
    /// or `pattern_no_match`.
    pub fn category(&self) -> &'static str {
        match self {
            Self::DomainNotAllowed | Self::DomainDenied => "domain",
            Self::PathNotAllowed | Self::PathDenied => "path",
            Self::FetchError => "fetch_error",
            Self::OutOfStock => "out_of_stock",
            Self::PatternNoMatch => "pattern_no_match",
        }
    }

    /// Detailed code written to the candidate trace.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DomainNotAllowed => "domain_not_whitelisted",
            Self::DomainDenied => "domain_blacklisted",
            Self::PathNotAllowed => "url_not_whitelisted",
            Self::PathDenied => "url_blacklisted",
            Self::FetchError => "fetch_error",
            Self::OutOfStock => "out_of_stock_marker",
            Self::PatternNoMatch => "pattern_final_no_match",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Position of a candidate in the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateState {
    Listed,
    DomainPassed,
    PathPassed,
    Fetched,
    PatternProvisional,
    AvailabilityChecked,
    Priced,
    Accepted,
    Rejected(RejectReason),
}

impl CandidateState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected(_))
    }
}

/// Outcome of testing the product-identity pattern.
///
/// A miss on the static page stays `Pending` until the rendered page has
/// had its chance; only then does it become `Absent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMatch {
    Matched,
    Pending,
    Absent,
}

impl PatternMatch {
    pub fn from_hit(hit: bool) -> Self {
        if hit {
            Self::Matched
        } else {
            Self::Pending
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched)
    }

    /// Close a pending match: nothing more can confirm it.
    pub fn finalize(self) -> Self {
        match self {
            Self::Pending => Self::Absent,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_tokens() {
        assert_eq!(CurrencyUnit::from_token("zł"), CurrencyUnit::Reference);
        assert_eq!(CurrencyUnit::from_token("PLN"), CurrencyUnit::Reference);
        assert_eq!(CurrencyUnit::from_token("ZŁ"), CurrencyUnit::Reference);
        assert_eq!(CurrencyUnit::from_token("€"), CurrencyUnit::Euro);
        assert_eq!(CurrencyUnit::from_token("Eur"), CurrencyUnit::Euro);
        assert_eq!(CurrencyUnit::from_token("Kč"), CurrencyUnit::CzechCrown);
        assert_eq!(CurrencyUnit::from_token("kc"), CurrencyUnit::CzechCrown);
        assert_eq!(CurrencyUnit::from_token("USD"), CurrencyUnit::Unrecognized);
    }

    #[test]
    fn test_pattern_match_finalize() {
        assert_eq!(PatternMatch::Pending.finalize(), PatternMatch::Absent);
        assert_eq!(PatternMatch::Matched.finalize(), PatternMatch::Matched);
        assert_eq!(PatternMatch::from_hit(false), PatternMatch::Pending);
    }

    #[test]
    fn test_reject_categories() {
        assert_eq!(RejectReason::DomainDenied.category(), "domain");
        assert_eq!(RejectReason::PathNotAllowed.category(), "path");
        assert_eq!(RejectReason::OutOfStock.code(), "out_of_stock_marker");
        assert!(CandidateState::Rejected(RejectReason::FetchError).is_terminal());
        assert!(!CandidateState::Fetched.is_terminal());
    }
}

//! Run-scoped filter configuration.
//!
//! The `*Settings` structs mirror the configuration file sections and are
//! deserialized verbatim. [`FilterContext::compile`] turns them into the
//! immutable context the pipeline reads for the duration of a run.

use std::collections::BTreeSet;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Search and candidate filtering options (`websearch:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchSettings {
    pub max_results: usize,
    pub site_whitelist: Vec<String>,
    pub site_blacklist: Vec<String>,
    pub url_whitelist_patterns: Vec<String>,
    pub url_blacklist_patterns: Vec<String>,
    pub exact_phrase: bool,
    pub prefer_country_pl: bool,
    /// Delay between consecutive result pages.
    pub page_delay_ms: u64,
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        Self {
            max_results: 10,
            site_whitelist: Vec::new(),
            site_blacklist: Vec::new(),
            url_whitelist_patterns: Vec::new(),
            url_blacklist_patterns: Vec::new(),
            exact_phrase: false,
            prefer_country_pl: true,
            page_delay_ms: 1000,
        }
    }
}

/// Availability markers (`availability_keywords:` section).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilitySettings {
    pub out_of_stock: Vec<String>,
}

/// Currency rate table (`currency:` section).
///
/// A foreign unit converts only when its `parse_*` flag is set and its rate
/// is present and positive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyRates {
    pub parse_eur: bool,
    pub parse_czk: bool,
    pub eur_to_pln: Option<f64>,
    pub czk_to_pln: Option<f64>,
}

/// Load condition the renderer waits for before capturing markup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
    #[default]
    NetworkIdle,
}

/// JavaScript rendering policy (`rendering:` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub enable_js: bool,
    pub max_js_pages_per_run: usize,
    pub nav_timeout_ms: u64,
    pub wait_until: WaitUntil,
    pub js_domains_whitelist: Vec<String>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            enable_js: false,
            max_js_pages_per_run: 0,
            nav_timeout_ms: 12_000,
            wait_until: WaitUntil::NetworkIdle,
            js_domains_whitelist: Vec::new(),
        }
    }
}

/// Immutable configuration consulted by every stage of the cascade.
#[derive(Debug, Clone)]
pub struct FilterContext {
    pub domain_allow: BTreeSet<String>,
    pub domain_deny: BTreeSet<String>,
    pub path_allow: Vec<Regex>,
    pub path_deny: Vec<Regex>,
    pub product_pattern: Option<Regex>,
    /// Lower-cased "out of stock" phrases.
    pub out_of_stock_markers: Vec<String>,
    pub require_in_stock: bool,
    pub rates: CurrencyRates,
    pub render: RenderPolicy,
    pub max_results: usize,
    pub page_delay: Duration,
}

/// Rendering section of a [`FilterContext`].
#[derive(Debug, Clone)]
pub struct RenderPolicy {
    pub enabled: bool,
    pub max_renders_per_run: usize,
    pub nav_timeout_ms: u64,
    pub wait_until: WaitUntil,
    pub domain_allow: BTreeSet<String>,
}

impl From<&RenderSettings> for RenderPolicy {
    fn from(s: &RenderSettings) -> Self {
        Self {
            enabled: s.enable_js,
            max_renders_per_run: s.max_js_pages_per_run,
            nav_timeout_ms: s.nav_timeout_ms,
            wait_until: s.wait_until,
            domain_allow: s.js_domains_whitelist.iter().cloned().collect(),
        }
    }
}

impl Default for FilterContext {
    fn default() -> Self {
        Self::compile(
            &WebSearchSettings::default(),
            &AvailabilitySettings::default(),
            false,
            &CurrencyRates::default(),
            &RenderSettings::default(),
            None,
        )
    }
}

impl FilterContext {
    /// Build a context from configuration sections and an optional
    /// product-identity pattern.
    ///
    /// An invalid identity pattern leaves the context without one. Invalid
    /// path patterns are dropped individually. Both are logged.
    pub fn compile(
        search: &WebSearchSettings,
        availability: &AvailabilitySettings,
        require_in_stock: bool,
        rates: &CurrencyRates,
        render: &RenderSettings,
        product_pattern: Option<&str>,
    ) -> Self {
        Self {
            domain_allow: search.site_whitelist.iter().cloned().collect(),
            domain_deny: search.site_blacklist.iter().cloned().collect(),
            path_allow: compile_patterns(&search.url_whitelist_patterns),
            path_deny: compile_patterns(&search.url_blacklist_patterns),
            product_pattern: None,
            out_of_stock_markers: availability
                .out_of_stock
                .iter()
                .map(|m| m.to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
            require_in_stock,
            rates: rates.clone(),
            render: RenderPolicy::from(render),
            max_results: search.max_results,
            page_delay: Duration::from_millis(search.page_delay_ms),
        }
        .with_product_pattern(product_pattern)
    }

    /// Same context with a different identity pattern.
    pub fn with_product_pattern(mut self, pattern: Option<&str>) -> Self {
        self.product_pattern = pattern.filter(|p| !p.is_empty()).and_then(|p| {
            compile_pattern(p)
                .map_err(|e| tracing::warn!("Ignoring product pattern: {e}"))
                .ok()
        });
        self
    }

    /// Whether the availability check applies to this run at all.
    pub fn checks_availability(&self) -> bool {
        self.require_in_stock && !self.out_of_stock_markers.is_empty()
    }
}

/// Compile a single regex, reporting the offending pattern on failure.
pub fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError {
        pattern: pattern.to_string(),
        source,
    })
}

fn compile_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match compile_pattern(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("Skipping URL pattern: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_product_pattern_is_unset() {
        let ctx = FilterContext::default().with_product_pattern(Some("(unclosed"));
        assert!(ctx.product_pattern.is_none());

        let ctx = FilterContext::default().with_product_pattern(Some("(?i)rlc-810a"));
        assert!(ctx.product_pattern.is_some());
    }

    #[test]
    fn test_invalid_path_pattern_skipped() {
        let search = WebSearchSettings {
            url_whitelist_patterns: vec!["/produkt/".into(), "[broken".into()],
            ..Default::default()
        };
        let ctx = FilterContext::compile(
            &search,
            &AvailabilitySettings::default(),
            false,
            &CurrencyRates::default(),
            &RenderSettings::default(),
            None,
        );
        assert_eq!(ctx.path_allow.len(), 1);
    }

    #[test]
    fn test_markers_lowercased() {
        let availability = AvailabilitySettings {
            out_of_stock: vec!["Brak w magazynie".into(), "".into()],
        };
        let ctx = FilterContext::compile(
            &WebSearchSettings::default(),
            &availability,
            true,
            &CurrencyRates::default(),
            &RenderSettings::default(),
            None,
        );
        assert_eq!(ctx.out_of_stock_markers, vec!["brak w magazynie".to_string()]);
        assert!(ctx.checks_availability());
    }

    #[test]
    fn test_render_defaults() {
        let ctx = FilterContext::default();
        assert!(!ctx.render.enabled);
        assert_eq!(ctx.render.nav_timeout_ms, 12_000);
        assert_eq!(ctx.render.wait_until, WaitUntil::NetworkIdle);
        assert_eq!(ctx.max_results, 10);
    }

    #[test]
    fn test_wait_until_names() {
        let w: WaitUntil = serde_json::from_str("\"domcontentloaded\"").unwrap();
        assert_eq!(w, WaitUntil::DomContentLoaded);
        let w: WaitUntil = serde_json::from_str("\"networkidle\"").unwrap();
        assert_eq!(w, WaitUntil::NetworkIdle);
    }
}

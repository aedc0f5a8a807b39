//! Agent configuration file.
//!
//! Every section is optional. The core sections are the library's own
//! settings types, so they are read here verbatim and compiled into one
//! [`FilterContext`] per product.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use pricewatch::config::compile_pattern;
use pricewatch::{
    AvailabilitySettings, CurrencyRates, FilterContext, RenderSettings, WebSearchSettings,
};

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Minutes between scheduled runs.
    pub frequency_minutes: u64,
    pub require_in_stock: bool,
    pub politeness: Politeness,
    pub websearch: WebSearchSettings,
    pub availability_keywords: AvailabilitySettings,
    pub currency: CurrencyRates,
    pub rendering: RenderSettings,
    pub debug: DebugSettings,
    pub storage: StorageSettings,
    pub products: Vec<ProductConfig>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            frequency_minutes: 60,
            require_in_stock: false,
            politeness: Politeness::default(),
            websearch: WebSearchSettings::default(),
            availability_keywords: AvailabilitySettings::default(),
            currency: CurrencyRates::default(),
            rendering: RenderSettings::default(),
            debug: DebugSettings::default(),
            storage: StorageSettings::default(),
            products: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Politeness {
    pub per_store_delay_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for Politeness {
    fn default() -> Self {
        Self {
            per_store_delay_seconds: 5,
            request_timeout_seconds: 10,
        }
    }
}

/// Candidate trace dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub dump_urls_csv: bool,
    pub dump_file: PathBuf,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            dump_urls_csv: false,
            dump_file: PathBuf::from("checked_urls.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub database: PathBuf,
    pub found_csv: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("offers.db"),
            found_csv: PathBuf::from("found.csv"),
        }
    }
}

/// One watched product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    /// Search term, also the product label in reports.
    pub name: String,
    pub max_price_pln: f64,
    #[serde(default)]
    pub stores: Vec<String>,
    /// Product-identity regex.
    #[serde(default)]
    pub pattern: Option<String>,
}

impl AgentConfig {
    /// Read and parse a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config: {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty document is a valid, all-default configuration.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Filter context for one product's searches.
    pub fn filter_context(&self, product: &ProductConfig) -> FilterContext {
        FilterContext::compile(
            &self.websearch,
            &self.availability_keywords,
            self.require_in_stock,
            &self.currency,
            &self.rendering,
            product.pattern.as_deref(),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.politeness.request_timeout_seconds)
    }

    pub fn per_store_delay(&self) -> Duration {
        Duration::from_secs(self.politeness.per_store_delay_seconds)
    }

    /// Interval between scheduled runs, at least one minute.
    pub fn frequency(&self) -> Duration {
        Duration::from_secs(self.frequency_minutes.max(1) * 60)
    }

    /// Problems that degrade a run without stopping it.
    pub fn warnings(&self, known_stores: &[&str]) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.products.is_empty() {
            warnings.push("no products configured".to_string());
        }
        for pattern in self
            .websearch
            .url_whitelist_patterns
            .iter()
            .chain(&self.websearch.url_blacklist_patterns)
        {
            if let Err(e) = compile_pattern(pattern) {
                warnings.push(format!("URL pattern skipped: {e}"));
            }
        }
        if self.currency.parse_eur && !self.currency.eur_to_pln.is_some_and(|r| r > 0.0) {
            warnings.push("parse_eur is set but eur_to_pln is missing; EUR prices are dropped".into());
        }
        if self.currency.parse_czk && !self.currency.czk_to_pln.is_some_and(|r| r > 0.0) {
            warnings.push("parse_czk is set but czk_to_pln is missing; CZK prices are dropped".into());
        }
        if self.rendering.enable_js && self.rendering.max_js_pages_per_run == 0 {
            warnings.push("enable_js is set but max_js_pages_per_run is 0".to_string());
        }

        for product in &self.products {
            if let Some(pattern) = product.pattern.as_deref().filter(|p| !p.is_empty()) {
                if let Err(e) = compile_pattern(pattern) {
                    warnings.push(format!("{}: pattern ignored: {e}", product.name));
                }
            }
            if product.stores.is_empty() {
                warnings.push(format!("{}: no stores configured", product.name));
            }
            for store in &product.stores {
                if !known_stores.contains(&store.as_str()) {
                    warnings.push(format!("{}: unknown store {store:?}", product.name));
                }
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricewatch::WaitUntil;

    const SAMPLE: &str = r#"
frequency_minutes: 30
require_in_stock: true
politeness:
  per_store_delay_seconds: 2
websearch:
  max_results: 15
  site_whitelist: [".pl"]
  url_blacklist_patterns: ["/blog/", "[broken"]
  exact_phrase: true
availability_keywords:
  in_stock: ["dostępny"]
  out_of_stock: ["Brak w magazynie", "niedostępny"]
currency:
  parse_eur: true
  eur_to_pln: 4.3
rendering:
  enable_js: true
  max_js_pages_per_run: 3
  wait_until: domcontentloaded
  js_domains_whitelist: ["x-kom.pl"]
products:
  - name: "Reolink RLC-810A"
    max_price_pln: 300
    stores: [web, allegro]
    pattern: "(?i)rlc-?810a"
"#;

    #[test]
    fn test_parse_sample() {
        let config = AgentConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.frequency_minutes, 30);
        assert_eq!(config.politeness.per_store_delay_seconds, 2);
        assert_eq!(config.politeness.request_timeout_seconds, 10);
        assert_eq!(config.websearch.max_results, 15);
        assert!(config.websearch.prefer_country_pl);
        assert_eq!(config.rendering.wait_until, WaitUntil::DomContentLoaded);
        assert_eq!(config.rendering.nav_timeout_ms, 12_000);
        assert_eq!(config.storage.database, PathBuf::from("offers.db"));
        assert_eq!(config.products[0].max_price_pln, 300.0);
    }

    #[test]
    fn test_filter_context_per_product() {
        let config = AgentConfig::from_yaml(SAMPLE).unwrap();
        let ctx = config.filter_context(&config.products[0]);
        assert!(ctx.product_pattern.is_some());
        assert!(ctx.checks_availability());
        assert_eq!(ctx.out_of_stock_markers[0], "brak w magazynie");
        assert_eq!(ctx.path_deny.len(), 1);
        assert_eq!(ctx.render.max_renders_per_run, 3);
        assert_eq!(ctx.max_results, 15);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = AgentConfig::from_yaml("").unwrap();
        assert!(config.products.is_empty());
        assert_eq!(config.frequency(), Duration::from_secs(3600));
    }

    #[test]
    fn test_warnings() {
        let config = AgentConfig::from_yaml(SAMPLE).unwrap();
        let warnings = config.warnings(&["web"]);
        assert!(warnings.iter().any(|w| w.contains("[broken")));
        assert!(warnings.iter().any(|w| w.contains("unknown store \"allegro\"")));
        assert!(!warnings.iter().any(|w| w.contains("eur_to_pln")));
    }

    #[test]
    fn test_load_missing_file() {
        let err = AgentConfig::load(Path::new("/nonexistent/pricewatch.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn test_product_requires_name() {
        assert!(AgentConfig::from_yaml("products:\n  - max_price_pln: 10\n").is_err());
    }
}

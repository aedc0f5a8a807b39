//! Per-product, per-store run loop and the schedule around it.

use std::sync::Arc;

use anyhow::{Context, Result};

use pricewatch::{
    CandidateObserver, ChromiumRenderer, DocumentFetcher, GoogleCseProvider, HttpFetcher,
    NoopRenderer, Offer, QueryOptions, RenderBudget, Renderer, SearchError, SearchProvider,
    SourceRegistry, WebSearchSource, WEB_STORE,
};

use crate::config::{AgentConfig, ProductConfig};
use crate::export::{DebugDump, FoundCsv};
use crate::storage::OfferStore;
use crate::summary::OfferSummary;

/// Store keys the agent can resolve.
pub const STORE_KEYS: &[&str] = &[WEB_STORE];

/// Totals for one run over all products.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub searches: usize,
    pub failed_searches: usize,
    pub offers: usize,
    pub priced: usize,
    pub deals: usize,
    pub stored: usize,
    pub renders: usize,
}

/// Build the source registry from configuration.
///
/// Missing search credentials leave the web source registered but empty.
pub fn build_registry(
    config: &AgentConfig,
    observer: Option<Arc<dyn CandidateObserver>>,
) -> Result<SourceRegistry> {
    let timeout = config.request_timeout();
    let fetcher: Arc<dyn DocumentFetcher> =
        Arc::new(HttpFetcher::new(timeout).context("failed to build HTTP client")?);

    let renderer: Arc<dyn Renderer> = if config.rendering.enable_js {
        Arc::new(ChromiumRenderer::new())
    } else {
        Arc::new(NoopRenderer)
    };

    let provider: Option<Arc<dyn SearchProvider>> =
        match GoogleCseProvider::from_env(QueryOptions::from(&config.websearch), timeout) {
            Ok(p) => Some(Arc::new(p)),
            Err(SearchError::MissingCredentials(var)) => {
                tracing::warn!("{var} not set; web search disabled");
                None
            }
            Err(e) => return Err(e).context("failed to build search client"),
        };

    let mut web = WebSearchSource::new(provider, fetcher, renderer);
    if let Some(observer) = observer {
        web = web.with_observer(observer);
    }

    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(web));
    Ok(registry)
}

/// Runs configured product searches and records the results.
pub struct Agent {
    config: AgentConfig,
    registry: SourceRegistry,
    store: OfferStore,
    found: FoundCsv,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        registry: SourceRegistry,
        store: OfferStore,
        found: FoundCsv,
    ) -> Self {
        Self {
            config,
            registry,
            store,
            found,
        }
    }

    /// Wire up the real collaborators: HTTP fetcher, search provider,
    /// renderer, SQLite store and CSV exports.
    pub fn from_config(config: AgentConfig) -> Result<Self> {
        let observer: Option<Arc<dyn CandidateObserver>> = if config.debug.dump_urls_csv {
            let dump = DebugDump::open(&config.debug.dump_file)?;
            tracing::info!("Writing candidate trace to {}", dump.path().display());
            Some(Arc::new(dump))
        } else {
            None
        };

        let registry = build_registry(&config, observer)?;
        let store = OfferStore::open(&config.storage.database)?;
        let found = FoundCsv::new(&config.storage.found_csv);
        Ok(Self::new(config, registry, store, found))
    }

    pub fn store(&self) -> &OfferStore {
        &self.store
    }

    /// One pass over every product and store with a fresh render budget.
    pub async fn run_once(&self) -> Result<RunSummary> {
        let mut budget = RenderBudget::new(self.config.rendering.max_js_pages_per_run);
        let mut summary = RunSummary::default();

        for product in &self.config.products {
            tracing::info!(
                "Checking {} (<= {:.2} PLN) in {:?}",
                product.name,
                product.max_price_pln,
                product.stores
            );
            let ctx = self.config.filter_context(product);

            for key in &product.stores {
                let source = match self.registry.get(key) {
                    Ok(source) => source,
                    Err(e) => {
                        tracing::warn!("{e}; skipping");
                        continue;
                    }
                };

                summary.searches += 1;
                let offers = match source.search(&product.name, &ctx, &mut budget).await {
                    Ok(offers) => offers,
                    Err(e) => {
                        tracing::error!("Search in {key} failed for {:?}: {e}", product.name);
                        summary.failed_searches += 1;
                        Vec::new()
                    }
                };

                self.record(product, key, &offers, &mut summary)?;

                let delay = self.config.per_store_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        summary.renders = budget.used();
        tracing::info!(
            "Run finished: {} search(es), {} offer(s), {} priced, {} deal(s), {} render(s)",
            summary.searches,
            summary.offers,
            summary.priced,
            summary.deals,
            summary.renders
        );
        Ok(summary)
    }

    fn record(
        &self,
        product: &ProductConfig,
        store: &str,
        offers: &[Offer],
        summary: &mut RunSummary,
    ) -> Result<()> {
        let report = OfferSummary::new(offers, product.max_price_pln);
        report.log(&product.name, store, offers);

        let found_at = chrono::Utc::now().to_rfc3339();
        summary.stored += self
            .store
            .insert_offers(offers, &found_at)
            .context("failed to store offers")?;
        self.found
            .append(&product.name, offers, &found_at)
            .with_context(|| format!("failed to append {}", self.found.path().display()))?;

        if let Some(message) = report.notification(&product.name) {
            tracing::info!("{message}");
        }

        summary.offers += report.total;
        summary.priced += report.priced.len();
        summary.deals += report.deal_count();
        Ok(())
    }

    /// Run immediately, then every `frequency_minutes`, until Ctrl-C.
    pub async fn run_forever(&self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.frequency());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(
            "Agent started; running every {} min",
            self.config.frequency().as_secs() / 60
        );

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = &mut shutdown => break,
                result = self.run_once() => {
                    if let Err(e) = result {
                        tracing::error!("Run failed: {e:#}");
                    }
                }
            }
        }

        tracing::info!("Stopped.");
        Ok(())
    }
}

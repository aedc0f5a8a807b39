//! Offer sources selected by store key.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::FilterContext;
use crate::error::SourceError;
use crate::fetch::DocumentFetcher;
use crate::pipeline::OfferPipeline;
use crate::render::{RenderBudget, Renderer};
use crate::search::SearchProvider;
use crate::trace::CandidateObserver;
use crate::types::{Offer, WEB_STORE};

/// Something that can turn a search term into offers.
#[async_trait]
pub trait OfferSource: Send + Sync {
    /// Configuration key of this source, also the store tag of its offers.
    fn store(&self) -> &str;

    async fn search(
        &self,
        term: &str,
        ctx: &FilterContext,
        budget: &mut RenderBudget,
    ) -> Result<Vec<Offer>, SourceError>;
}

/// Open web search run through the full candidate cascade.
pub struct WebSearchSource {
    provider: Option<Arc<dyn SearchProvider>>,
    fetcher: Arc<dyn DocumentFetcher>,
    renderer: Arc<dyn Renderer>,
    observer: Option<Arc<dyn CandidateObserver>>,
}

impl WebSearchSource {
    /// `provider` is `None` when search credentials are not configured; the
    /// source then yields no offers.
    pub fn new(
        provider: Option<Arc<dyn SearchProvider>>,
        fetcher: Arc<dyn DocumentFetcher>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            provider,
            fetcher,
            renderer,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CandidateObserver>) -> Self {
        self.observer = Some(observer);
        self
    }
}

#[async_trait]
impl OfferSource for WebSearchSource {
    fn store(&self) -> &str {
        WEB_STORE
    }

    async fn search(
        &self,
        term: &str,
        ctx: &FilterContext,
        budget: &mut RenderBudget,
    ) -> Result<Vec<Offer>, SourceError> {
        let Some(provider) = self.provider.as_deref() else {
            tracing::warn!("Web search not configured (GOOGLE_CSE_KEY / GOOGLE_CSE_CX); skipping {term:?}");
            return Ok(Vec::new());
        };

        let mut pipeline =
            OfferPipeline::new(ctx, self.fetcher.as_ref(), self.renderer.as_ref()).with_store(WEB_STORE);
        if let Some(observer) = self.observer.as_deref() {
            pipeline = pipeline.with_observer(observer);
        }

        let report = pipeline.run(term, provider, budget).await?;
        Ok(report.offers)
    }
}

/// Sources indexed by their store key.
#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn OfferSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source under its own store key, replacing any previous one.
    pub fn register(&mut self, source: Arc<dyn OfferSource>) {
        self.sources.insert(source.store().to_string(), source);
    }

    pub fn get(&self, key: &str) -> Result<Arc<dyn OfferSource>, SourceError> {
        self.sources
            .get(key)
            .cloned()
            .ok_or_else(|| SourceError::UnknownStore(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sources.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

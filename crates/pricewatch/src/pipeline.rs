//! Candidate cascade and search run loop.
//!
//! Each candidate walks `Listed → DomainPassed → PathPassed → Fetched →
//! PatternProvisional → AvailabilityChecked → Priced → Accepted` and may
//! leave as `Rejected(reason)` from any non-terminal state. Candidates are
//! processed one at a time; the only state shared between them is the
//! run's [`RenderBudget`].

use std::collections::BTreeMap;

use url::Url;

use crate::availability::document_out_of_stock;
use crate::config::FilterContext;
use crate::dedup::dedup_by_url;
use crate::error::SearchError;
use crate::extract::ExtractorChain;
use crate::fetch::DocumentFetcher;
use crate::filter::{check_domain, check_path, registrable_domain, render_allowed};
use crate::render::{render_bounded, RenderBudget, RenderOptions, Renderer};
use crate::search::SearchProvider;
use crate::trace::{CandidateObserver, TraceEvent, TraceStage};
use crate::types::{Candidate, CandidateState, Offer, PatternMatch, RejectReason, WEB_STORE};

/// Final disposition of one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    Accepted(Offer),
    Rejected(RejectReason),
    /// The candidate had no URL and never entered the cascade.
    Skipped,
}

/// Counters for one search run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub pages: usize,
    pub listed: usize,
    pub accepted: usize,
    /// Rejections keyed by reason category.
    pub rejected: BTreeMap<&'static str, usize>,
    pub renders: usize,
}

impl RunStats {
    fn record(&mut self, outcome: &CandidateOutcome) {
        match outcome {
            CandidateOutcome::Accepted(_) => {
                self.listed += 1;
                self.accepted += 1;
            }
            CandidateOutcome::Rejected(reason) => {
                self.listed += 1;
                *self.rejected.entry(reason.category()).or_default() += 1;
            }
            CandidateOutcome::Skipped => {}
        }
    }

    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// Offers and counters produced by one search.
#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    /// URL-deduplicated, in emission order.
    pub offers: Vec<Offer>,
    pub stats: RunStats,
}

/// Drives candidates through the filter cascade.
pub struct OfferPipeline<'a> {
    ctx: &'a FilterContext,
    fetcher: &'a dyn DocumentFetcher,
    renderer: &'a dyn Renderer,
    extractors: ExtractorChain,
    observer: Option<&'a dyn CandidateObserver>,
    store: String,
}

impl<'a> OfferPipeline<'a> {
    pub fn new(
        ctx: &'a FilterContext,
        fetcher: &'a dyn DocumentFetcher,
        renderer: &'a dyn Renderer,
    ) -> Self {
        Self {
            ctx,
            fetcher,
            renderer,
            extractors: ExtractorChain::default(),
            observer: None,
            store: WEB_STORE.to_string(),
        }
    }

    /// Report every cascade step to `observer`.
    pub fn with_observer(mut self, observer: &'a dyn CandidateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_extractors(mut self, extractors: ExtractorChain) -> Self {
        self.extractors = extractors;
        self
    }

    /// Store tag written into emitted offers.
    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = store.into();
        self
    }

    fn emit(&self, event: &TraceEvent) {
        if let Some(observer) = self.observer {
            observer.observe(event);
        }
    }

    fn advance(&self, url: &str, state: CandidateState) {
        tracing::debug!(url, ?state, "candidate transition");
    }

    fn reject(&self, mut event: TraceEvent, reason: RejectReason) -> CandidateOutcome {
        self.advance(&event.url, CandidateState::Rejected(reason));
        event.stage = TraceStage::Rejected(reason);
        self.emit(&event);
        CandidateOutcome::Rejected(reason)
    }

    fn identity_hit(&self, title: &str, document: &str) -> PatternMatch {
        match &self.ctx.product_pattern {
            Some(re) => PatternMatch::from_hit(re.is_match(title) || re.is_match(document)),
            None => PatternMatch::Matched,
        }
    }

    /// Push one candidate through the cascade.
    pub async fn process(
        &self,
        query: &str,
        candidate: &Candidate,
        budget: &mut RenderBudget,
    ) -> CandidateOutcome {
        let url = candidate.url.as_str();
        if url.is_empty() {
            return CandidateOutcome::Skipped;
        }
        let ctx = self.ctx;
        let domain = registrable_domain(url);
        let mut event = TraceEvent::listed(query, candidate, &domain);
        self.advance(url, CandidateState::Listed);
        self.emit(&event);

        // ── Domain and path ────────────────────────────────────────────
        if let Err(reason) = check_domain(&domain, ctx) {
            event.passed_domain = Some(false);
            return self.reject(event, reason);
        }
        event.passed_domain = Some(true);
        self.advance(url, CandidateState::DomainPassed);

        if let Err(reason) = check_path(url, ctx) {
            event.passed_url_regex = Some(false);
            return self.reject(event, reason);
        }
        event.passed_url_regex = Some(true);
        self.advance(url, CandidateState::PathPassed);

        // ── Static fetch ───────────────────────────────────────────────
        let document = match self.fetcher.fetch(url).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Fetch failed for {url}: {e}");
                return self.reject(event, RejectReason::FetchError);
            }
        };
        event.fetched = true;
        event.stage = TraceStage::Fetched;
        self.advance(url, CandidateState::Fetched);
        self.emit(&event);

        // ── Provisional identity match ─────────────────────────────────
        let mut identity = self.identity_hit(&candidate.title, &document);
        event.matched_pattern = Some(identity.is_matched());
        self.advance(url, CandidateState::PatternProvisional);
        if identity == PatternMatch::Pending {
            event.stage = TraceStage::PatternPending;
            self.emit(&event);
        }

        // ── Availability and price on the static document ──────────────
        if ctx.checks_availability() && document_out_of_stock(&document, &ctx.out_of_stock_markers)
        {
            return self.reject(event, RejectReason::OutOfStock);
        }
        self.advance(url, CandidateState::AvailabilityChecked);

        let mut price = self.extractors.price(&document, &ctx.rates);

        // ── Rendered fallback ──────────────────────────────────────────
        if price.is_none()
            && ctx.render.enabled
            && render_allowed(&domain, ctx)
            && budget.has_remaining()
        {
            let options = RenderOptions::from(&ctx.render);
            if let Some(rendered) = render_bounded(self.renderer, budget, url, &options).await {
                event.used_js = true;
                if identity == PatternMatch::Pending {
                    identity = self.identity_hit(&candidate.title, &rendered);
                    event.matched_pattern = Some(identity.is_matched());
                }
                if ctx.checks_availability()
                    && document_out_of_stock(&rendered, &ctx.out_of_stock_markers)
                {
                    return self.reject(event, RejectReason::OutOfStock);
                }
                price = self.extractors.price(&rendered, &ctx.rates);
            }
        }
        event.price = price;
        self.advance(url, CandidateState::Priced);

        // ── Final identity decision ────────────────────────────────────
        if identity.finalize() == PatternMatch::Absent {
            return self.reject(event, RejectReason::PatternNoMatch);
        }

        self.advance(url, CandidateState::Accepted);
        event.stage = TraceStage::Accepted;
        self.emit(&event);

        let offer = Offer {
            store: self.store.clone(),
            title: html_escape::decode_html_entities(&candidate.title).into_owned(),
            url: canonical_url(url),
            price,
        };
        match offer.price {
            Some(p) => tracing::info!("Accepted {} at {p:.2}", offer.url),
            None => tracing::info!("Accepted {} without price", offer.url),
        }
        CandidateOutcome::Accepted(offer)
    }

    /// Page through the provider until `max_results` offers are accepted or
    /// a page comes back empty.
    ///
    /// Only a failure of the first page aborts the run. A later page failure
    /// ends paging and keeps what was accepted; every per-candidate failure
    /// becomes a rejection.
    pub async fn run(
        &self,
        term: &str,
        provider: &dyn SearchProvider,
        budget: &mut RenderBudget,
    ) -> Result<SearchReport, SearchError> {
        let max_results = self.ctx.max_results;
        let renders_before = budget.used();
        let mut offers = Vec::new();
        let mut stats = RunStats::default();
        let mut page = 0;

        'pages: while offers.len() < max_results {
            if page > 0 && !self.ctx.page_delay.is_zero() {
                tokio::time::sleep(self.ctx.page_delay).await;
            }

            let candidates = match provider.search_page(term, page).await {
                Ok(candidates) => candidates,
                Err(e) if page == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!("Search {term:?} page {page} failed, keeping earlier pages: {e}");
                    break;
                }
            };
            page += 1;
            stats.pages = page;
            if candidates.is_empty() {
                tracing::debug!("No more results for {term:?} after {} page(s)", page - 1);
                self.emit(&TraceEvent::no_results(term));
                break;
            }

            for candidate in &candidates {
                let outcome = self.process(term, candidate, budget).await;
                stats.record(&outcome);
                if let CandidateOutcome::Accepted(offer) = outcome {
                    offers.push(offer);
                    if offers.len() >= max_results {
                        break 'pages;
                    }
                }
            }
        }

        stats.renders = budget.used() - renders_before;
        let offers = dedup_by_url(offers);
        tracing::info!(
            "Search {term:?}: {} page(s), {} listed, {} accepted, {} rejected {:?}, {} render(s), {} unique offer(s)",
            stats.pages,
            stats.listed,
            stats.accepted,
            stats.rejected_total(),
            stats.rejected,
            stats.renders,
            offers.len()
        );
        Ok(SearchReport { offers, stats })
    }
}

/// Normalized form of a URL, or the input unchanged when it does not parse.
pub fn canonical_url(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

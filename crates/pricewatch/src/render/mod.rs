//! Bounded JavaScript rendering fallback.
//!
//! Defines the `Renderer` trait that abstracts over the browser engine
//! (currently Chromium via chromiumoxide) and the run-scoped
//! [`RenderBudget`] that caps how many pages a single run may render.

pub mod chromium;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{RenderPolicy, WaitUntil};
use crate::error::RenderError;

pub use chromium::ChromiumRenderer;

/// Post-load pause that lets late scripts finish before capture.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Per-render navigation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub nav_timeout_ms: u64,
    pub wait_until: WaitUntil,
}

impl From<&RenderPolicy> for RenderOptions {
    fn from(policy: &RenderPolicy) -> Self {
        Self {
            nav_timeout_ms: policy.nav_timeout_ms,
            wait_until: policy.wait_until,
        }
    }
}

/// A headless engine that returns the final markup of a page.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigate to `url`, wait for the load condition plus the settle delay,
    /// and return the rendered HTML.
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<String, RenderError>;
}

/// A renderer used when no browser is configured. Every call fails.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn render(&self, _url: &str, _options: &RenderOptions) -> Result<String, RenderError> {
        Err(RenderError::Unavailable("rendering disabled".to_string()))
    }
}

/// Run-scoped cap on render attempts.
///
/// Passed by `&mut` through a run; the counter only grows. A new run
/// starts from a new budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderBudget {
    limit: usize,
    used: usize,
}

impl RenderBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used)
    }

    pub fn has_remaining(&self) -> bool {
        self.used < self.limit
    }

    /// Claim one render attempt. Returns `false` once the budget is spent.
    pub fn try_consume(&mut self) -> bool {
        if self.has_remaining() {
            self.used += 1;
            true
        } else {
            false
        }
    }
}

/// Render `url` if the budget allows, charging the budget for the attempt
/// whether or not it succeeds.
///
/// Returns `None` when the budget is exhausted, the engine fails, or the
/// rendered markup is empty.
pub async fn render_bounded(
    renderer: &dyn Renderer,
    budget: &mut RenderBudget,
    url: &str,
    options: &RenderOptions,
) -> Option<String> {
    if !budget.try_consume() {
        tracing::debug!("Render budget exhausted ({}), skipping {url}", budget.limit());
        return None;
    }
    match renderer.render(url, options).await {
        Ok(html) if !html.trim().is_empty() => Some(html),
        Ok(_) => {
            tracing::debug!("Rendered page was empty: {url}");
            None
        }
        Err(e) => {
            tracing::warn!("Render failed for {url}: {e}");
            None
        }
    }
}

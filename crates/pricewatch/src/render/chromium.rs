//! Chromium-based renderer using chromiumoxide.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;

use super::{RenderOptions, Renderer, SETTLE_DELAY};
use crate::config::WaitUntil;
use crate::error::RenderError;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. PRICEWATCH_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("PRICEWATCH_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser", "chrome"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Whether navigation waits beyond the load event.
fn waits_for_idle(wait_until: WaitUntil) -> bool {
    wait_until == WaitUntil::NetworkIdle
}

/// Errors after which the cached browser is dropped and relaunched next time.
fn invalidates_browser(err: &RenderError) -> bool {
    matches!(err, RenderError::Launch(_) | RenderError::Navigation(_))
}

/// Headless Chromium renderer.
///
/// The browser is launched on the first render and reused afterwards.
/// Renders are serialized: the engine session is not shared between
/// concurrent navigations.
pub struct ChromiumRenderer {
    browser: Mutex<Option<Browser>>,
    executable: Option<PathBuf>,
}

impl Default for ChromiumRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChromiumRenderer {
    pub fn new() -> Self {
        Self {
            browser: Mutex::new(None),
            executable: None,
        }
    }

    /// Use a specific browser binary instead of searching for one.
    pub fn with_executable(path: impl Into<PathBuf>) -> Self {
        Self {
            browser: Mutex::new(None),
            executable: Some(path.into()),
        }
    }

    async fn launch(&self) -> Result<Browser, RenderError> {
        let chrome_path = self
            .executable
            .clone()
            .or_else(find_chromium)
            .ok_or_else(|| RenderError::Unavailable("Chromium not found".to_string()))?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--lang=pl-PL")
            .build()
            .map_err(|e| RenderError::Launch(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        // Spawn the handler task
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        tracing::info!("Launched headless Chromium");
        Ok(browser)
    }

    async fn navigate(page: &Page, url: &str, options: &RenderOptions) -> Result<(), RenderError> {
        let load = async {
            page.goto(url)
                .await
                .map_err(|e| RenderError::Navigation(e.to_string()))?;
            // `goto` already returns after the load event, which covers
            // `load` and `domcontentloaded`.
            if waits_for_idle(options.wait_until) {
                if let Err(e) = page.wait_for_navigation().await {
                    tracing::debug!(url, "Network idle wait failed: {e}");
                }
            }
            Ok::<(), RenderError>(())
        };

        tokio::time::timeout(Duration::from_millis(options.nav_timeout_ms), load)
            .await
            .map_err(|_| RenderError::Timeout(options.nav_timeout_ms))?
    }

    async fn capture(page: &Page) -> Result<String, RenderError> {
        let result = page
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| RenderError::Capture(e.to_string()))?;

        result
            .into_value::<String>()
            .map_err(|e| RenderError::Capture(format!("{e:?}")))
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<String, RenderError> {
        let mut guard = self.browser.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let browser = guard
            .as_ref()
            .ok_or_else(|| RenderError::Unavailable("browser not running".to_string()))?;

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Dropping headless Chromium after page failure: {e}");
                *guard = None;
                return Err(RenderError::Launch(format!("failed to create new page: {e}")));
            }
        };

        let result = async {
            Self::navigate(&page, url, options).await?;
            tokio::time::sleep(SETTLE_DELAY).await;
            Self::capture(&page).await
        }
        .await;

        let _ = page.close().await;
        if let Err(e) = &result {
            if invalidates_browser(e) {
                tracing::debug!("Relaunching headless Chromium on next render: {e}");
                *guard = None;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_executable_is_unavailable() {
        let renderer = ChromiumRenderer::with_executable("/nonexistent/chrome-binary");
        let options = RenderOptions {
            nav_timeout_ms: 1000,
            wait_until: WaitUntil::Load,
        };
        assert!(renderer.render("https://example.com", &options).await.is_err());
    }

    #[test]
    fn test_only_network_idle_waits_past_load() {
        assert!(waits_for_idle(WaitUntil::NetworkIdle));
        assert!(!waits_for_idle(WaitUntil::Load));
        assert!(!waits_for_idle(WaitUntil::DomContentLoaded));
    }

    #[test]
    fn test_broken_session_errors_drop_browser() {
        assert!(invalidates_browser(&RenderError::Launch("crashed".into())));
        assert!(invalidates_browser(&RenderError::Navigation("target closed".into())));
        assert!(!invalidates_browser(&RenderError::Timeout(1000)));
        assert!(!invalidates_browser(&RenderError::Capture("no value".into())));
    }

    #[tokio::test]
    async fn test_failed_launch_leaves_no_browser() {
        let renderer = ChromiumRenderer::with_executable("/nonexistent/chrome-binary");
        let options = RenderOptions {
            nav_timeout_ms: 1000,
            wait_until: WaitUntil::Load,
        };
        for _ in 0..2 {
            assert!(renderer.render("https://example.com", &options).await.is_err());
            assert!(renderer.browser.lock().await.is_none());
        }
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_render_data_url() {
        let renderer = ChromiumRenderer::new();
        let options = RenderOptions {
            nav_timeout_ms: 10_000,
            wait_until: WaitUntil::Load,
        };
        let html = renderer
            .render(
                "data:text/html,<p id=p></p><script>document.getElementById('p').textContent='199 zł'</script>",
                &options,
            )
            .await
            .expect("render failed");
        assert!(html.contains("199 zł"));
    }
}

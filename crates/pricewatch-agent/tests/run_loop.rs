//! Run loop integration tests with an in-memory offer source.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pricewatch::{
    FilterContext, Offer, OfferSource, RenderBudget, SearchError, SourceError, SourceRegistry,
};
use pricewatch_agent::{Agent, AgentConfig, FoundCsv, OfferStore};

// ─────────────────────── helpers ───────────────────────

/// Returns fixed offers and claims one render per search.
struct FixedSource {
    offers: Vec<Offer>,
    fail: bool,
    /// (term, renders used before this search, identity pattern set)
    seen: Mutex<Vec<(String, usize, bool)>>,
}

impl FixedSource {
    fn new(offers: Vec<Offer>) -> Self {
        Self {
            offers,
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait]
impl OfferSource for FixedSource {
    fn store(&self) -> &str {
        "web"
    }

    async fn search(
        &self,
        term: &str,
        ctx: &FilterContext,
        budget: &mut RenderBudget,
    ) -> Result<Vec<Offer>, SourceError> {
        self.seen.lock().unwrap().push((
            term.to_string(),
            budget.used(),
            ctx.product_pattern.is_some(),
        ));
        budget.try_consume();
        if self.fail {
            return Err(SearchError::Status(500).into());
        }
        Ok(self.offers.clone())
    }
}

fn offer(url: &str, price: Option<f64>) -> Offer {
    Offer {
        store: "web".into(),
        title: format!("Kamera {url}"),
        url: url.into(),
        price,
    }
}

const CONFIG: &str = r#"
politeness:
  per_store_delay_seconds: 0
rendering:
  enable_js: true
  max_js_pages_per_run: 5
products:
  - name: "Reolink RLC-810A"
    max_price_pln: 300
    stores: [web, allegro]
    pattern: "(?i)rlc-?810a"
  - name: "Tapo C320WS"
    max_price_pln: 150
    stores: [web]
"#;

fn agent(dir: &tempfile::TempDir, source: Arc<FixedSource>) -> Agent {
    let config = AgentConfig::from_yaml(CONFIG).unwrap();
    let mut registry = SourceRegistry::new();
    registry.register(source);
    let store = OfferStore::open(&dir.path().join("offers.db")).unwrap();
    let found = FoundCsv::new(dir.path().join("found.csv"));
    Agent::new(config, registry, store, found)
}

// ─────────────────────── tests ───────────────────────

#[tokio::test]
async fn test_run_once_stores_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(FixedSource::new(vec![
        offer("https://a.pl/1", Some(279.0)),
        offer("https://a.pl/2", None),
        offer("https://a.pl/3", Some(410.0)),
    ]));
    let agent = agent(&dir, source.clone());

    let summary = agent.run_once().await.unwrap();

    // Unknown "allegro" is skipped; two products searched on "web".
    assert_eq!(summary.searches, 2);
    assert_eq!(summary.offers, 6);
    assert_eq!(summary.priced, 4);
    // 279 <= 300 for the first product; nothing <= 150 for the second.
    assert_eq!(summary.deals, 1);
    assert_eq!(agent.store().count().unwrap(), summary.stored);
    assert!(summary.stored >= 2);

    let seen = source.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "Reolink RLC-810A");
    assert!(seen[0].2);
    assert!(!seen[1].2);

    let csv = std::fs::read_to_string(dir.path().join("found.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "product,store,title,price_pln,url,found_at");
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("Reolink RLC-810A,web,"));
}

#[tokio::test]
async fn test_render_budget_shared_within_run_reset_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(FixedSource::new(Vec::new()));
    let agent = agent(&dir, source.clone());

    let first = agent.run_once().await.unwrap();
    let second = agent.run_once().await.unwrap();

    let used_before: Vec<usize> = source.seen.lock().unwrap().iter().map(|s| s.1).collect();
    assert_eq!(used_before, vec![0, 1, 0, 1]);
    assert_eq!(first.renders, 2);
    assert_eq!(second.renders, 2);
}

#[tokio::test]
async fn test_failed_search_does_not_stop_run() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(FixedSource::failing());
    let agent = agent(&dir, source.clone());

    let summary = agent.run_once().await.unwrap();

    assert_eq!(summary.searches, 2);
    assert_eq!(summary.failed_searches, 2);
    assert_eq!(summary.offers, 0);
    assert_eq!(agent.store().count().unwrap(), 0);
    assert!(!dir.path().join("found.csv").exists());
}

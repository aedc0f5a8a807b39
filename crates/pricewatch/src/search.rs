//! Search-provider collaborators producing raw candidates.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::WebSearchSettings;
use crate::error::SearchError;
use crate::types::Candidate;

/// Results requested per page.
pub const PAGE_SIZE: usize = 10;

/// Google Custom Search JSON API endpoint.
pub const GOOGLE_CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// A paginated web search.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Fetch the zero-based `page` of results for `term`. An empty page
    /// means the provider has nothing more.
    async fn search_page(&self, term: &str, page: usize) -> Result<Vec<Candidate>, SearchError>;
}

/// Query options forwarded to the provider.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub exact_phrase: bool,
    pub prefer_country_pl: bool,
}

impl From<&WebSearchSettings> for QueryOptions {
    fn from(s: &WebSearchSettings) -> Self {
        Self {
            exact_phrase: s.exact_phrase,
            prefer_country_pl: s.prefer_country_pl,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Option<Vec<CseItem>>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Google Custom Search provider.
pub struct GoogleCseProvider {
    client: reqwest::Client,
    endpoint: String,
    key: String,
    cx: String,
    options: QueryOptions,
}

impl GoogleCseProvider {
    pub fn new(
        key: impl Into<String>,
        cx: impl Into<String>,
        options: QueryOptions,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: GOOGLE_CSE_ENDPOINT.to_string(),
            key: key.into(),
            cx: cx.into(),
            options,
        })
    }

    /// Read `GOOGLE_CSE_KEY` and `GOOGLE_CSE_CX` from the environment.
    pub fn from_env(options: QueryOptions, timeout: Duration) -> Result<Self, SearchError> {
        let key = non_empty_env("GOOGLE_CSE_KEY")
            .ok_or(SearchError::MissingCredentials("GOOGLE_CSE_KEY"))?;
        let cx = non_empty_env("GOOGLE_CSE_CX")
            .ok_or(SearchError::MissingCredentials("GOOGLE_CSE_CX"))?;
        Self::new(key, cx, options, timeout)
    }

    /// Point the provider at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn query(&self, term: &str, page: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("key", self.key.clone()),
            ("cx", self.cx.clone()),
            ("q", term.to_string()),
            ("num", PAGE_SIZE.to_string()),
            ("hl", "pl".to_string()),
            ("gl", "pl".to_string()),
            ("safe", "off".to_string()),
            ("start", (page * PAGE_SIZE + 1).to_string()),
        ];
        if self.options.exact_phrase {
            params.push(("exactTerms", term.to_string()));
        }
        if self.options.prefer_country_pl {
            params.push(("cr", "countryPL".to_string()));
        }
        params
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl SearchProvider for GoogleCseProvider {
    async fn search_page(&self, term: &str, page: usize) -> Result<Vec<Candidate>, SearchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&self.query(term, page))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body: CseResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(body
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|item| Candidate::new(item.link.unwrap_or_default(), item.title.unwrap_or_default()))
            .collect())
    }
}

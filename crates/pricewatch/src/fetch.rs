//! Static document retrieval.
//!
//! Not a browser, just a browser-like GET. No retries: any failure ends
//! the candidate, never the run.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;

/// Browser-like user agent sent with every document request.
pub const USER_AGENT: &str = "Mozilla/5.0";

/// Preferred response language.
pub const ACCEPT_LANGUAGE: &str = "pl-PL,pl;q=0.9";

/// Fetches the raw text of a candidate page.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// HTTP fetcher backed by reqwest.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static(ACCEPT_LANGUAGE),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        // Decodes with the charset declared in Content-Type, UTF-8 otherwise.
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_sends_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/produkt"))
            .and(header("user-agent", USER_AGENT))
            .and(header("accept-language", ACCEPT_LANGUAGE))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>199 zł</p>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let body = fetcher
            .fetch(&format!("{}/produkt", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<p>199 zł</p>");
    }

    #[tokio::test]
    async fn test_declared_charset_is_decoded() {
        let server = MockServer::start().await;
        // "Produkt niedostępny, 199 zł" in ISO-8859-2.
        let mut body = b"<p>Produkt niedost".to_vec();
        body.push(0xEA);
        body.extend_from_slice(b"pny, 199 z");
        body.push(0xB3);
        body.extend_from_slice(b"</p>");
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=iso-8859-2"),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let text = fetcher.fetch(&server.uri()).await.unwrap();
        assert_eq!(text, "<p>Produkt niedostępny, 199 zł</p>");

        let rates = crate::config::CurrencyRates::default();
        let price = crate::extract::ExtractorChain::default().price(&text, &rates);
        assert_eq!(price, Some(199.0));
    }

    #[tokio::test]
    async fn test_error_status_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("slow")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_millis(50)).unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }
}

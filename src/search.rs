//! Image search collaborator
//!
//! [`ImageSearch`] is the narrow seam the acquirer depends on; the shipped
//! implementation scrapes DuckDuckGo's image endpoint.

use crate::error::{CurationError, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

const DUCKDUCKGO_URL: &str = "https://duckduckgo.com/";
const USER_AGENT: &str = concat!("dataset-curator/", env!("CARGO_PKG_VERSION"));

/// Finds image URLs for a text query
#[async_trait]
pub trait ImageSearch: Send + Sync {
    /// Return at most `limit` distinct image URLs for `query`
    ///
    /// # Errors
    /// Transport failures or an unusable provider response.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    image: String,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<SearchResult>,
    next: Option<String>,
}

fn vqd_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"vqd=["']?([\d-]+)["']?"#).expect("vqd pattern is valid")
    })
}

/// Pull the `vqd` request token out of the search landing page
fn extract_vqd(html: &str) -> Option<String> {
    vqd_regex()
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_string())
}

fn parse_page(body: &str) -> Result<SearchPage> {
    serde_json::from_str(body)
        .map_err(|e| CurationError::search(format!("Malformed search results: {}", e)))
}

/// DuckDuckGo image search
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    client: Client,
    page_delay: Duration,
}

impl DuckDuckGoSearch {
    /// Create a search client with a one second pause between result pages
    ///
    /// # Errors
    /// When the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CurationError::network_error("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            page_delay: Duration::from_secs(1),
        })
    }

    /// Override the pause between result pages
    #[must_use]
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    async fn fetch_token(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .post(DUCKDUCKGO_URL)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| CurationError::network_error("Failed to fetch search page", e))?;

        if !response.status().is_success() {
            return Err(CurationError::network_error(
                format!("HTTP error {} for search page", response.status()),
                query,
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| CurationError::network_error("Failed to read search page", e))?;

        extract_vqd(&html)
            .ok_or_else(|| CurationError::search(format!("No vqd token for query '{}'", query)))
    }

    async fn fetch_page(&self, url: &str, params: &[(&str, &str)]) -> Result<SearchPage> {
        let response = self
            .client
            .get(url)
            .query(params)
            .header(reqwest::header::REFERER, DUCKDUCKGO_URL)
            .send()
            .await
            .map_err(|e| CurationError::network_error("Failed to fetch search results", e))?;

        if !response.status().is_success() {
            return Err(CurationError::network_error(
                format!("HTTP error {} for {}", response.status(), url),
                "search results",
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CurationError::network_error("Failed to read search results", e))?;
        parse_page(&body)
    }
}

#[async_trait]
impl ImageSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let token = self.fetch_token(query).await?;
        let params = [
            ("l", "us-en"),
            ("o", "json"),
            ("q", query),
            ("vqd", token.as_str()),
            ("f", ",,,"),
            ("p", "1"),
        ];

        let mut urls = Vec::new();
        let mut seen = HashSet::new();
        let mut next_url = format!("{}i.js", DUCKDUCKGO_URL);

        while urls.len() < limit {
            let page = match self.fetch_page(&next_url, &params).await {
                Ok(page) => page,
                // A failed later page ends the search with what was collected so far
                Err(e) if !urls.is_empty() => {
                    log::warn!("Stopping search for '{}' early: {}", query, e);
                    break;
                },
                Err(e) => return Err(e),
            };

            for result in page.results {
                if urls.len() >= limit {
                    break;
                }
                if seen.insert(result.image.clone()) {
                    urls.push(result.image);
                }
            }

            match page.next {
                Some(next) => next_url = format!("{}{}", DUCKDUCKGO_URL, next.trim_start_matches('/')),
                None => break,
            }

            tokio::time::sleep(self.page_delay).await;
        }

        log::info!("Search for '{}' returned {} URLs", query, urls.len());
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_vqd_variants() {
        let html = r#"<script>nrj('/d.js?q=persian+cat&vqd=4-123456789012&l=us-en')</script>"#;
        assert_eq!(extract_vqd(html).as_deref(), Some("4-123456789012"));

        let quoted = r#"var x = {vqd="4-98765432",p:1}"#;
        assert_eq!(extract_vqd(quoted).as_deref(), Some("4-98765432"));

        assert!(extract_vqd("<html>no token here</html>").is_none());
    }

    #[test]
    fn test_parse_page() {
        let body = r#"{
            "results": [
                {"image": "https://example.com/a.jpg", "title": "a"},
                {"image": "https://example.com/b.jpeg", "title": "b"}
            ],
            "next": "i.js?q=trees&s=100"
        }"#;
        let page = parse_page(body).unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[1].image, "https://example.com/b.jpeg");
        assert_eq!(page.next.as_deref(), Some("i.js?q=trees&s=100"));

        let last = parse_page(r#"{"results": []}"#).unwrap();
        assert!(last.next.is_none());

        assert!(matches!(
            parse_page("<html>rate limited</html>"),
            Err(CurationError::Search(_))
        ));
    }

    #[test]
    fn test_client_builds() {
        let search = DuckDuckGoSearch::new()
            .unwrap()
            .with_page_delay(Duration::ZERO);
        assert_eq!(search.page_delay, Duration::ZERO);
    }
}

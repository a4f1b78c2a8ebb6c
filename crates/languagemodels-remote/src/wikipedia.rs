//! Topic summaries from Wikipedia.
//!
//! A title search returns up to five candidates; each is fetched in turn and
//! the first page that is not a disambiguation page supplies its intro.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, info};

use reqwest::header;

use crate::{RemoteError, USER_AGENT};

pub const DEFAULT_SEARCH_URL: &str = "https://api.wikimedia.org/core/v1/wikipedia/en/search/title";
pub const DEFAULT_PAGE_URL: &str = "https://en.wikipedia.org/w/api.php";

/// Number of title matches requested from the search endpoint.
pub const SEARCH_LIMIT: usize = 5;

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    pages: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    query: Option<QueryPages>,
}

#[derive(Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    title: String,
    extract: Option<String>,
    #[serde(default)]
    pageprops: HashMap<String, serde_json::Value>,
}

impl Page {
    fn is_disambiguation(&self) -> bool {
        self.pageprops.contains_key("disambiguation")
    }
}

pub struct WikipediaClient {
    client: reqwest::Client,
    search_url: String,
    page_url: String,
}

impl Default for WikipediaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WikipediaClient {
    pub fn new() -> Self {
        Self::with_endpoints(DEFAULT_SEARCH_URL.to_string(), DEFAULT_PAGE_URL.to_string())
    }

    /// Client for alternative search and page endpoints (e.g. another wiki).
    pub fn with_endpoints(search_url: String, page_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            search_url,
            page_url,
        }
    }

    /// Use a preconfigured HTTP client (proxy, timeouts, TLS roots).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Intro extract of the first non-disambiguation page matching `topic`.
    ///
    /// Returns `Ok(None)` when the search finds nothing or every candidate is
    /// a disambiguation page.
    pub async fn summary(&self, topic: &str) -> Result<Option<String>, RemoteError> {
        let titles = self.search_titles(topic).await?;
        info!(topic, candidates = titles.len(), "wikipedia title search");

        for title in &titles {
            let pages = self.fetch_pages(title).await?;
            for page in pages {
                if page.is_disambiguation() {
                    debug!(title = %page.title, "skipping disambiguation page");
                    continue;
                }
                match page.extract {
                    Some(extract) => return Ok(Some(extract)),
                    None => debug!(title = %page.title, "page has no extract"),
                }
            }
        }

        Ok(None)
    }

    async fn search_titles(&self, topic: &str) -> Result<Vec<String>, RemoteError> {
        let limit = SEARCH_LIMIT.to_string();
        let resp = self
            .client
            .get(&self.search_url)
            .header(header::USER_AGENT, USER_AGENT)
            .query(&[("q", topic), ("limit", limit.as_str())])
            .send()
            .await?;
        let search: SearchResponse = parse_json(resp).await?;
        Ok(search.pages.into_iter().map(|hit| hit.title).collect())
    }

    async fn fetch_pages(&self, title: &str) -> Result<Vec<Page>, RemoteError> {
        let resp = self
            .client
            .get(&self.page_url)
            .header(header::USER_AGENT, USER_AGENT)
            .query(&[
                ("action", "query"),
                ("prop", "extracts|pageprops"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("format", "json"),
                ("titles", title),
            ])
            .send()
            .await?;
        let query: QueryResponse = parse_json(resp).await?;
        Ok(query
            .query
            .map(|q| q.pages.into_values().collect())
            .unwrap_or_default())
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, RemoteError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(RemoteError::Server {
            status: status.as_u16(),
            body,
        });
    }
    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}

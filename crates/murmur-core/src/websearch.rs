//! Web search with two independent providers.
//!
//! DuckDuckGo instant answers are the primary source. When a query yields
//! nothing there (or the provider is unreachable), Wikipedia opensearch is
//! consulted instead. Results from either provider are normalized to
//! [`SearchHit`].

use serde::{Deserialize, Serialize};

use crate::constants::{DUCKDUCKGO_API_BASE, MAX_SEARCH_RESULTS, WIKIPEDIA_API_BASE};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct DdgResponse {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<DdgTopic>,
}

/// Related topics are either plain results or nested category groups.
#[derive(Debug, Deserialize)]
struct DdgTopic {
    #[serde(rename = "Text", default)]
    text: Option<String>,
    #[serde(rename = "FirstURL", default)]
    first_url: Option<String>,
    #[serde(rename = "Topics", default)]
    topics: Vec<DdgTopic>,
}

/// Wikipedia opensearch replies with a positional JSON array:
/// `[query, [titles], [descriptions], [urls]]`.
type OpensearchResponse = (String, Vec<String>, Vec<String>, Vec<String>);

pub struct WebSearchClient {
    ddg_base: String,
    wikipedia_base: String,
    client: reqwest::Client,
}

impl WebSearchClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_urls(client, DUCKDUCKGO_API_BASE, WIKIPEDIA_API_BASE)
    }

    pub fn with_base_urls(
        client: reqwest::Client,
        ddg_base: impl Into<String>,
        wikipedia_base: impl Into<String>,
    ) -> Self {
        Self {
            ddg_base: ddg_base.into(),
            wikipedia_base: wikipedia_base.into(),
            client,
        }
    }

    /// Query the primary provider, falling back to the secondary when the
    /// primary has nothing (or fails).
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("empty search query".to_string()));
        }

        match self.search_duckduckgo(query).await {
            Ok(hits) if !hits.is_empty() => return Ok(hits),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "primary search provider failed, trying fallback");
            }
        }
        self.search_wikipedia(query).await
    }

    async fn search_duckduckgo(&self, query: &str) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .get(&self.ddg_base)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, message });
        }

        let parsed: DdgResponse = response.json().await?;
        Ok(collect_ddg_hits(parsed))
    }

    async fn search_wikipedia(&self, query: &str) -> Result<Vec<SearchHit>> {
        let limit = MAX_SEARCH_RESULTS.to_string();
        let response = self
            .client
            .get(&self.wikipedia_base)
            .query(&[
                ("action", "opensearch"),
                ("search", query),
                ("limit", limit.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, message });
        }

        let parsed: OpensearchResponse = response.json().await?;
        Ok(collect_opensearch_hits(parsed))
    }
}

fn collect_ddg_hits(response: DdgResponse) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    if !response.abstract_text.is_empty() && !response.abstract_url.is_empty() {
        hits.push(SearchHit {
            title: response.heading.clone(),
            url: response.abstract_url.clone(),
            snippet: response.abstract_text.clone(),
        });
    }

    flatten_topics(&response.related_topics, &mut hits);
    hits.truncate(MAX_SEARCH_RESULTS);
    hits
}

fn flatten_topics(topics: &[DdgTopic], hits: &mut Vec<SearchHit>) {
    for topic in topics {
        if hits.len() >= MAX_SEARCH_RESULTS {
            return;
        }
        match (&topic.text, &topic.first_url) {
            (Some(text), Some(url)) if !text.is_empty() => {
                // DuckDuckGo packs "Title - description" into one field.
                let (title, snippet) = match text.split_once(" - ") {
                    Some((title, snippet)) => (title.to_string(), snippet.to_string()),
                    None => (text.clone(), text.clone()),
                };
                hits.push(SearchHit {
                    title,
                    url: url.clone(),
                    snippet,
                });
            }
            _ => flatten_topics(&topic.topics, hits),
        }
    }
}

fn collect_opensearch_hits(response: OpensearchResponse) -> Vec<SearchHit> {
    let (_, titles, descriptions, urls) = response;
    titles
        .into_iter()
        .zip(urls)
        .enumerate()
        .map(|(index, (title, url))| SearchHit {
            snippet: descriptions.get(index).cloned().unwrap_or_default(),
            title,
            url,
        })
        .take(MAX_SEARCH_RESULTS)
        .collect()
}

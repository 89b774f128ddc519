//! Recent-news enrichment for the risk forecaster.
//!
//! News is a non-critical input: any failure (no key, network, HTTP status,
//! malformed body) degrades to an empty list, and the forecaster prompt gets
//! [`NEWS_FALLBACK`] instead.
use crate::config::PipelineConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Prompt text used when no news could be fetched.
pub const NEWS_FALLBACK: &str = "No recent news available.";

/// One article summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub source: String,
    pub published_at: String,
}

/// Search recent news.
pub trait NewsSource {
    fn search(&self, query: &str, limit: u32) -> Result<Vec<Article>>;
}

/// The query and bound the forecaster uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub query: String,
    pub limit: u32,
}

impl NewsQuery {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            query: config.news_query.clone(),
            limit: config.news_page_size,
        }
    }
}

/// Fetch articles, treating any fault as "no news".
pub fn lookup_news<N: NewsSource + ?Sized>(source: &N, query: &NewsQuery) -> Vec<Article> {
    match source.search(&query.query, query.limit) {
        Ok(mut articles) => {
            articles.truncate(query.limit as usize);
            articles
        }
        Err(err) => {
            let error = format!("{err:#}");
            tracing::warn!(%error, "news lookup failed; continuing without news");
            Vec::new()
        }
    }
}

/// Render articles for the forecaster prompt.
pub fn news_context(articles: &[Article]) -> String {
    if articles.is_empty() {
        return NEWS_FALLBACK.to_string();
    }
    articles
        .iter()
        .map(|article| {
            format!(
                "{} - {} (Source: {}, Published: {})",
                article.title, article.description, article.source, article.published_at
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// NewsAPI `everything` client.
pub struct NewsApiClient {
    agent: ureq::Agent,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    source: Option<NewsApiSource>,
    #[serde(default)]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

impl From<NewsApiArticle> for Article {
    fn from(article: NewsApiArticle) -> Self {
        Self {
            title: article.title.unwrap_or_default(),
            description: article.description.unwrap_or_default(),
            source: article
                .source
                .and_then(|source| source.name)
                .unwrap_or_else(|| "unknown".to_string()),
            published_at: article.published_at.unwrap_or_default(),
        }
    }
}

impl NewsApiClient {
    pub fn new(config: &PipelineConfig, api_key: Option<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.news_timeout_secs)))
            .build()
            .into();
        Self {
            agent,
            endpoint: config.news_endpoint.clone(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }
}

impl NewsSource for NewsApiClient {
    fn search(&self, query: &str, limit: u32) -> Result<Vec<Article>> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::debug!("no news API key configured; skipping news lookup");
            return Ok(Vec::new());
        };
        let start = Instant::now();
        let mut response = self
            .agent
            .get(&self.endpoint)
            .query("q", query)
            .query("sortBy", "publishedAt")
            .query("language", "en")
            .query("pageSize", limit.to_string())
            .header("X-Api-Key", api_key)
            .call()
            .context("call news endpoint")?;
        let body: NewsApiResponse = response
            .body_mut()
            .read_json()
            .context("decode news response")?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            articles = body.articles.len(),
            "news lookup complete"
        );
        Ok(body.articles.into_iter().map(Article::from).collect())
    }
}

//! Tavily HTTP Client
//!
//! Direct reqwest client for Tavily's search endpoint, used to find web pages
//! related to an uploaded document.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{clamp_limit, DEFAULT_REFERENCE_LIMIT};
use crate::config::ReferencesConfig;
use crate::services::{ServiceError, WebReference, WebSearch};

const SERVICE_NAME: &str = "Web reference search";

#[derive(Debug, Default, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Option<Vec<TavilyResult>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TavilyResult {
    title: Option<String>,
    url: Option<String>,
    content: Option<String>,
    snippet: Option<String>,
    score: Option<f64>,
}

#[derive(Clone)]
pub struct TavilyClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl TavilyClient {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            endpoint: endpoint.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn from_config(config: &ReferencesConfig) -> Self {
        Self::new(
            &config.tavily_endpoint,
            config.tavily_api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl WebSearch for TavilyClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<WebReference>, ServiceError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ServiceError::NotConfigured(
                "TAVILY_API_KEY is not configured. Set it in your environment to enable web references."
                    .to_string(),
            )
        })?;

        let max_results = clamp_limit(Some(limit as i64), DEFAULT_REFERENCE_LIMIT);
        let body = json!({
            "query": query,
            "search_depth": "basic",
            "max_results": max_results,
        });

        debug!(query = %query, max_results = max_results, "Tavily search");
        let resp = self.http.post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_else(|_| "unknown error".to_string());
            error!(status = %status, body = %text, "Tavily HTTP error");
            return Err(ServiceError::Http {
                service: SERVICE_NAME,
                status: status.as_u16(),
                body: text,
            });
        }

        let data: TavilyResponse = resp.json().await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;

        let fetched_at = Utc::now();
        let references: Vec<WebReference> = data.results.unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|item| {
                let url = item.url.unwrap_or_default();
                let title = item.title
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .or_else(|| Some(url.clone()).filter(|u| !u.is_empty()))
                    .unwrap_or_else(|| "Untitled".to_string());
                let snippet = item.content
                    .filter(|c| !c.is_empty())
                    .or(item.snippet)
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                WebReference {
                    title,
                    source: extract_hostname(&url),
                    url,
                    snippet,
                    fetched_at,
                    score: item.score,
                }
            })
            .collect();

        info!(query = %query, results = references.len(), "Fetched web references");
        Ok(references)
    }
}

/// Hostname of `url` without a leading `www.`
pub fn extract_hostname(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

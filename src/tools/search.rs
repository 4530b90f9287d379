//! Web search through the Tavily API.

use super::{required_str, Tool, ToolOutput};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Proxies a web search API and returns ranked snippets.
pub struct SearchTool {
    http: reqwest::Client,
    api_key: Option<String>,
    max_results: u32,
    base_url: String,
}

impl SearchTool {
    pub fn new(http: reqwest::Client, api_key: Option<String>, max_results: u32) -> Self {
        Self {
            http,
            api_key,
            max_results,
            base_url: TAVILY_BASE_URL.to_string(),
        }
    }

    /// Point the tool at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// One ranked result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns a ranked list of results \
        with title, URL and a content snippet."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolOutput> {
        let query = required_str(&arguments, "query")?;

        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(ToolOutput::error("TAVILY_API_KEY not set."));
        };

        debug!("Searching for: {}", query);

        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .json(&SearchRequest {
                api_key,
                query,
                max_results: self.max_results,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(ToolOutput::text(format!("Search failed: {}", body)));
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(ToolOutput::Json(serde_json::to_value(parsed.results)?))
    }
}

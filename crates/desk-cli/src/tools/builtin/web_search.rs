//! Web search tool using Tavily, summarized into setup steps by the model

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use desk_core::config::{require, SearchConfig};
use desk_core::{ChatMessage, ChatModel};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::tools::{str_arg, ParameterProperty, ParameterSchema, Tool, ToolContext, ToolKind, ToolResult};

const RESEARCH_PROMPT: &str = "You are an AI research assistant. \
Your sole purpose is to provide steps to setup instructions for user query";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

/// Tool that searches the web and answers with step-by-step instructions
pub struct WebSearchTool {
    config: SearchConfig,
    client: reqwest::Client,
    summarizer: Arc<dyn ChatModel>,
}

impl WebSearchTool {
    pub fn new(config: SearchConfig, summarizer: Arc<dyn ChatModel>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            client,
            summarizer,
        })
    }

    /// Run the search and return results in ranked order
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let api_key = require(&self.config.api_key, "TAVILY_API_KEY")?;
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));

        let req = SearchRequest {
            api_key,
            query,
            search_depth: &self.config.search_depth,
            max_results: self.config.max_results,
        };

        debug!("Sending search request");
        let resp = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("Search request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, "Search rejected");
            // the provider's error text goes back to the model as-is
            anyhow::bail!("{}", body);
        }

        let parsed: SearchResponse = resp.json().await.context("Failed to parse search response")?;
        Ok(parsed.results)
    }
}

/// Messages asking the model to turn search results into instructions
fn summary_prompt(query: &str, hits: &[SearchHit]) -> Vec<ChatMessage> {
    let information = serde_json::to_string(hits).unwrap_or_default();
    vec![
        ChatMessage::system(RESEARCH_PROMPT),
        ChatMessage::user(format!(
            "Information: \"\"\"{}\"\"\"\n\n\
             Using the above information, answer the following query: \"{}\" as a series of steps to take --",
            information, query
        )),
    ]
}

#[async_trait]
impl Tool for WebSearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetHelp
    }

    fn description(&self) -> &str {
        "Performs a search to get detailed instructions/help based on the user query. \
         Returns detailed instructions as a series of steps."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new().with_required("query", ParameterProperty::string("should be a search query"))
    }

    #[instrument(skip(self, args, ctx), fields(query = tracing::field::Empty, thread = %ctx.thread_id))]
    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<ToolResult> {
        let query = str_arg(args, "query")?;

        // Record query in span (truncate for safety)
        tracing::Span::current().record("query", query.chars().take(50).collect::<String>().as_str());

        let hits = match self.search(query).await {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "Search failed");
                return Ok(ToolResult::error(format!("{:#}", e)));
            }
        };
        debug!(results = hits.len(), "Search returned results");

        match self.summarizer.chat(&summary_prompt(query, &hits), &[]).await {
            Ok(reply) => Ok(ToolResult::success(reply.text())),
            Err(e) => {
                warn!(error = %e, "Summary request failed");
                Ok(ToolResult::error(format!("{:#}", e)))
            }
        }
    }
}

//! Built-in tools for the service-desk agent

mod incident;
mod knowledge;
mod web_search;

pub use incident::CreateIncidentTool;
pub use knowledge::CreateKnowledgeArticleTool;
pub use web_search::WebSearchTool;

use std::sync::Arc;

use anyhow::Result;
use desk_core::{ChatModel, Config};

use super::registry::ToolRegistry;
use super::servicenow::ServiceNowClient;

/// Create a registry with every desk tool, validated for completeness
///
/// `summarizer` answers the follow-up question built from search results.
pub fn create_default_registry(config: &Config, summarizer: Arc<dyn ChatModel>) -> Result<ToolRegistry> {
    let servicenow = ServiceNowClient::new(config.servicenow.clone())?;

    let mut registry = ToolRegistry::new();
    registry.register(WebSearchTool::new(config.search.clone(), summarizer)?)?;
    registry.register(CreateIncidentTool::new(servicenow.clone()))?;
    registry.register(CreateKnowledgeArticleTool::new(servicenow))?;
    registry.ensure_complete()?;

    Ok(registry)
}

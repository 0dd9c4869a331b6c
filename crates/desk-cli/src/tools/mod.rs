//! Tool framework for the service-desk agent
//!
//! Three tools are available to the model: web search with summarization,
//! ServiceNow incident creation and ServiceNow knowledge article drafting.

pub mod builtin;
pub mod registry;
pub mod router;
pub mod servicenow;

use anyhow::Result;
use async_trait::async_trait;
use desk_core::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::checkpoint::ThreadId;

/// Closed set of tools the agent can bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolKind {
    /// Web search followed by a step-by-step summary
    GetHelp,
    CreateIncident,
    CreateKnowledgeArticle,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [
        ToolKind::GetHelp,
        ToolKind::CreateIncident,
        ToolKind::CreateKnowledgeArticle,
    ];

    /// Name the model uses to request this tool
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::GetHelp => "get_help",
            ToolKind::CreateIncident => "create_servicenow_incident",
            ToolKind::CreateKnowledgeArticle => "create_servicenow_knowledge_article",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ToolKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", s))
    }
}

/// Result of tool execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,
    /// Output from the tool
    pub output: String,
    /// Error message if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    /// Create a failed result
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    /// Text handed back to the model as the tool-result message
    pub fn content(&self) -> String {
        match (&self.error, self.success) {
            (Some(error), false) if self.output.is_empty() => error.clone(),
            _ => self.output.clone(),
        }
    }
}

/// Context provided to tools during execution
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Conversation the call belongs to
    pub thread_id: ThreadId,
}

impl ToolContext {
    pub fn new(thread_id: ThreadId) -> Self {
        Self { thread_id }
    }
}

/// Schema for a tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterProperty {
    /// Parameter type (only "string" is used by the desk tools)
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
}

impl ParameterProperty {
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            param_type: "string".to_string(),
            description: description.into(),
        }
    }
}

/// Schema describing tool parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Type is always "object"
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, ParameterProperty>,
    /// Required parameter names
    #[serde(default)]
    pub required: Vec<String>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn with_required(mut self, name: impl Into<String>, prop: ParameterProperty) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), prop);
        self.required.push(name);
        self
    }

    /// Check field presence and type; no deeper validation
    pub fn validate(&self, args: &Value) -> Result<()> {
        let obj = args
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("Arguments must be a JSON object"))?;

        for name in &self.required {
            if !obj.contains_key(name) {
                anyhow::bail!("Missing required parameter: {}", name);
            }
        }

        for (name, value) in obj {
            let Some(prop) = self.properties.get(name) else {
                continue;
            };
            let matches = match prop.param_type.as_str() {
                "string" => value.is_string(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !matches {
                anyhow::bail!("Parameter '{}' must be a {}", name, prop.param_type);
            }
        }

        Ok(())
    }
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch a required string argument
pub fn str_arg<'a>(args: &'a Value, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {}", name))
}

/// The Tool trait that all desk tools implement
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Get a description of what the tool does
    fn description(&self) -> &str;

    fn parameters_schema(&self) -> ParameterSchema;

    /// Execute the tool with the given arguments
    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<ToolResult>;

    /// Convert to a tool definition for the model
    fn to_definition(&self) -> ToolDefinition {
        let parameters = serde_json::to_value(self.parameters_schema()).unwrap_or_default();
        ToolDefinition::function(self.name(), self.description(), parameters)
    }
}

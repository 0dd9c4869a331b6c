//! Tool routing and dispatch

use tracing::{info, instrument, warn};

use desk_core::ToolCall;

use super::registry::ToolRegistry;
use super::{ToolContext, ToolResult};

/// Result of routing a tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteResult {
    /// Tool ran; the result may still be a failure
    Success(ToolResult),
    /// The model asked for a tool that is not registered
    NotFound(String),
    /// Arguments were rejected or the tool returned an error
    Error(String),
}

impl RouteResult {
    /// Text recorded as the tool-result message
    pub fn content(&self) -> String {
        match self {
            RouteResult::Success(result) => result.content(),
            RouteResult::NotFound(name) => format!("Unknown tool: {}", name),
            RouteResult::Error(e) => format!("Tool error: {}", e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RouteResult::Success(r) if r.success)
    }
}

/// Router for dispatching tool calls
pub struct ToolRouter {
    registry: ToolRegistry,
}

impl ToolRouter {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Route a single tool call
    #[instrument(skip(self, ctx), fields(tool = %tool_call.function.name, call_id = %tool_call.id, thread = %ctx.thread_id))]
    pub async fn route(&self, tool_call: &ToolCall, ctx: &ToolContext) -> RouteResult {
        let name = &tool_call.function.name;
        let args = &tool_call.function.arguments;

        let tool = match self.registry.resolve(name) {
            Some(t) => t,
            None => {
                warn!(tool = %name, "Tool not found");
                return RouteResult::NotFound(name.clone());
            }
        };

        if let Err(e) = tool.parameters_schema().validate(args) {
            warn!(error = %e, "Rejected tool arguments");
            return RouteResult::Error(e.to_string());
        }

        info!("Executing tool");
        match tool.execute(args, ctx).await {
            Ok(result) => {
                if result.success {
                    info!(output_len = result.output.len(), "Tool executed successfully");
                } else {
                    warn!(error = ?result.error, "Tool execution failed");
                }
                RouteResult::Success(result)
            }
            Err(e) => {
                warn!(error = %e, "Tool execution error");
                RouteResult::Error(format!("{:#}", e))
            }
        }
    }
}

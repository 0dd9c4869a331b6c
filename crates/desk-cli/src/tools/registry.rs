//! Tool registry: one implementation per tool kind

use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

use desk_core::ToolDefinition;

use super::{Tool, ToolKind};

/// Registry of available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolKind, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool; a second implementation of the same kind is an error
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let kind = tool.kind();
        if self.tools.contains_key(&kind) {
            bail!("Tool '{}' is already registered", kind);
        }
        self.tools.insert(kind, tool);
        Ok(())
    }

    /// Fail unless every tool kind has an implementation
    pub fn ensure_complete(&self) -> Result<()> {
        let missing: Vec<&str> = ToolKind::ALL
            .into_iter()
            .filter(|k| !self.tools.contains_key(k))
            .map(ToolKind::name)
            .collect();

        if !missing.is_empty() {
            bail!("No implementation registered for: {}", missing.join(", "));
        }
        Ok(())
    }

    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn Tool>> {
        self.tools.get(&kind).cloned()
    }

    /// Look up a tool by the name the model used
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        name.parse::<ToolKind>().ok().and_then(|k| self.get(k))
    }

    /// List all registered tool names
    pub fn list_names(&self) -> Vec<&'static str> {
        self.tools.keys().map(|k| k.name()).collect()
    }

    /// Get tool definitions for the model
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list_names())
            .finish()
    }
}

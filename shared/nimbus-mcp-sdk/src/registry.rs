//! Ordered tool registry

use serde_json::Value;
use std::sync::Arc;

use crate::tool::{Tool, ToolDefinition, ToolError, ToolResult};

/// Tools offered by a server, in registration order.
///
/// Cloning is cheap; every session shares the same tool instances.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> &mut Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| ToolDefinition::from(t.as_ref())).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn call(&self, name: &str, args: Value) -> Result<ToolResult, ToolError> {
        match self.get(name) {
            Some(tool) => tool.execute(args).await,
            None => Err(ToolError::NotFound(name.to_string())),
        }
    }
}

use super::{Result, ToolContext};
use async_trait::async_trait;
use std::sync::Arc;

/// Tool trait - abstraction for callable tools
///
/// A tool is one entry in a toolset's operation table: a name, a
/// description, a JSON schema for its parameters and a handler.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the name of the tool
    fn name(&self) -> &str;

    /// Returns a description of what the tool does
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's parameters
    fn schema(&self) -> serde_json::Value;

    /// Executes the tool with given parameters
    async fn execute(
        &self,
        ctx: Arc<dyn ToolContext>,
        params: serde_json::Value,
    ) -> Result<ToolResponse>;
}

/// Tool execution response
#[derive(Debug, Clone)]
pub struct ToolResponse {
    pub result: serde_json::Value,
}

impl ToolResponse {
    pub fn new(result: serde_json::Value) -> Self {
        Self { result }
    }

    /// Response carrying a plain text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            result: serde_json::Value::String(text.into()),
        }
    }
}

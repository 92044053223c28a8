//! MCP tool wrapper - bridges MCP tools to ZDK Tool trait

use crate::server::McpServer;
use crate::types::McpToolInfo;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use zdk_core::{Error, Result, Tool, ToolContext, ToolResponse};

/// Exposes one discovered MCP tool as a toolset operation
pub struct McpToolWrapper {
    mcp_tool: McpToolInfo,
    server: Arc<McpServer>,
}

impl McpToolWrapper {
    pub fn new(mcp_tool: McpToolInfo, server: Arc<McpServer>) -> Self {
        Self { mcp_tool, server }
    }

    pub fn server_id(&self) -> &str {
        self.server.id()
    }
}

#[async_trait]
impl Tool for McpToolWrapper {
    fn name(&self) -> &str {
        &self.mcp_tool.name
    }

    fn description(&self) -> &str {
        &self.mcp_tool.description
    }

    fn schema(&self) -> Value {
        self.mcp_tool.input_schema.clone()
    }

    async fn execute(&self, ctx: Arc<dyn ToolContext>, params: Value) -> Result<ToolResponse> {
        tracing::debug!(
            invocation_id = %ctx.invocation_id(),
            server = %self.server.id(),
            tool = %self.mcp_tool.name,
            "Executing MCP tool"
        );

        let result = self
            .server
            .call_tool(&self.mcp_tool.name, params)
            .await
            .map_err(|e| Error::tool_failed(&self.mcp_tool.name, e))?;

        tracing::debug!(
            invocation_id = %ctx.invocation_id(),
            tool = %self.mcp_tool.name,
            "MCP tool execution completed"
        );

        Ok(ToolResponse::text(result))
    }
}

impl std::fmt::Debug for McpToolWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpToolWrapper")
            .field("server", &self.server.id())
            .field("tool", &self.mcp_tool.name)
            .finish()
    }
}

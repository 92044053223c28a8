//! Server-backed toolsets
//!
//! A connected server is exposed as a toolset named `mcp-<server_id>`
//! whose operations are the server's discovered tools.

use crate::error::{McpError, Result};
use crate::server::McpServer;
use crate::tool_wrapper::McpToolWrapper;
use std::sync::Arc;
use zdk_core::Tool;
use zdk_tool::Toolset;

/// Prefix marking a toolset name as server-backed
pub const SERVER_TOOLSET_PREFIX: &str = "mcp-";

/// Toolset name for a server id
pub fn server_toolset_name(server_id: &str) -> String {
    format!("{SERVER_TOOLSET_PREFIX}{server_id}")
}

/// Server id referenced by a toolset name, if it is server-backed
pub fn server_id_from_toolset(toolset: &str) -> Option<&str> {
    toolset
        .strip_prefix(SERVER_TOOLSET_PREFIX)
        .filter(|id| !id.is_empty())
}

/// Builds the toolset for one connected server
pub struct McpToolset {
    server: Arc<McpServer>,
}

impl McpToolset {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }

    pub fn name(&self) -> String {
        server_toolset_name(self.server.id())
    }

    /// Wrap the server's current tool catalog, keeping only the tools the
    /// server config's allow-list exposes.
    ///
    /// The catalog is captured now; reconnecting the server needs a fresh
    /// toolset to pick up changes.
    pub async fn build(self) -> Result<Toolset> {
        if !self.server.is_connected().await {
            return Err(McpError::NotConnected(self.server.id().to_string()));
        }

        let name = self.name();
        let discovered = self.server.tools().await;
        let total = discovered.len();

        let tools: Vec<Arc<dyn Tool>> = discovered
            .into_iter()
            .filter(|tool| self.server.config().exposes(&tool.name))
            .map(|tool| Arc::new(McpToolWrapper::new(tool, self.server.clone())) as Arc<dyn Tool>)
            .collect();

        tracing::info!(
            toolset = %name,
            count = tools.len(),
            discovered = total,
            "Loaded tools from MCP server"
        );

        Ok(Toolset::new(name, tools)
            .with_description(format!("Tools served by MCP server '{}'", self.server.id())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::McpServerConfig;
    use crate::connection::StdioConnectionParams;
    use crate::retry::RetryPolicy;
    use crate::testing::{ScriptedTransport, ServerScript};
    use crate::types::McpToolInfo;
    use serde_json::json;
    use std::time::Duration;
    use zdk_tool::DefaultToolContext;

    fn files_server(config: McpServerConfig) -> Arc<McpServer> {
        let transport = ScriptedTransport::new().script(
            "files",
            ServerScript::default().tools(vec![
                McpToolInfo::new("read", "Read a file"),
                McpToolInfo::new("write", "Write a file"),
            ]),
        );
        Arc::new(McpServer::new("files", config, Arc::new(transport)))
    }

    fn stdio() -> McpServerConfig {
        McpServerConfig::stdio(StdioConnectionParams::new("files_server"))
    }

    #[test]
    fn test_toolset_naming() {
        assert_eq!(server_toolset_name("files"), "mcp-files");
        assert_eq!(server_id_from_toolset("mcp-files"), Some("files"));
        assert_eq!(server_id_from_toolset("mcp-"), None);
        assert_eq!(server_id_from_toolset("calculator"), None);
    }

    #[tokio::test]
    async fn test_build_requires_connection() {
        let server = files_server(stdio());
        let err = McpToolset::new(server).build().await.unwrap_err();
        assert!(matches!(err, McpError::NotConnected(_)));
    }

    #[tokio::test]
    async fn test_build_wraps_discovered_tools() {
        let server = files_server(stdio());
        assert!(server.connect(&RetryPolicy::new(1, Duration::ZERO)).await);

        let toolset = McpToolset::new(server).build().await.unwrap();
        assert_eq!(toolset.name(), "mcp-files");
        assert_eq!(toolset.operation_names(), vec!["read", "write"]);

        let names: Vec<String> = toolset.schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["mcp-files__read", "mcp-files__write"]);

        let ctx = Arc::new(DefaultToolContext::new("call-1", "inv-1"));
        let response = toolset
            .call(ctx, "mcp-files__read", json!({"message": "notes.txt"}))
            .await
            .unwrap();
        assert_eq!(response.result, "notes.txt");
    }

    #[tokio::test]
    async fn test_allow_list_from_config() {
        let server = files_server(stdio().tool_filter(["read"]));
        assert!(server.connect(&RetryPolicy::new(1, Duration::ZERO)).await);

        let toolset = McpToolset::new(server).build().await.unwrap();
        assert_eq!(toolset.operation_names(), vec!["read"]);
    }
}

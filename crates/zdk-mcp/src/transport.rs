//! The seam between connection lifecycle and wire protocol

use crate::config::McpServerConfig;
use crate::error::Result;
use crate::exit_stack::ExitStack;
use crate::types::{McpPromptInfo, McpResourceInfo, McpToolInfo, ResourceContent, ToolCallOutput};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Opens sessions to MCP servers.
///
/// Every handle the transport can release itself is pushed onto
/// `resources` before `connect` returns, so the caller can unwind a failed
/// or cancelled attempt by closing the stack. A handle still owned by an
/// unfinished handshake must clean up when it is dropped; the rmcp child
/// process transport kills its subprocess on drop.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Open the transport and run the initialize handshake
    async fn connect(
        &self,
        server_id: &str,
        config: &McpServerConfig,
        resources: &mut ExitStack,
    ) -> Result<Arc<dyn McpSession>>;
}

/// An initialized MCP client session
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait McpSession: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<McpToolInfo>>;

    async fn list_resources(&self) -> Result<Vec<McpResourceInfo>>;

    async fn list_prompts(&self) -> Result<Vec<McpPromptInfo>>;

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolCallOutput>;

    async fn read_resource(&self, uri: &str) -> Result<ResourceContent>;

    /// Render a prompt template to text
    async fn get_prompt(&self, name: &str, arguments: BTreeMap<String, String>) -> Result<String>;
}

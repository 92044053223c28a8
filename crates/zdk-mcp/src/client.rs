//! MCP client using the rmcp SDK

use crate::config::{McpServerConfig, TransportConfig};
use crate::connection::{HttpConnectionParams, StdioConnectionParams};
use crate::error::{McpError, Result};
use crate::exit_stack::{ExitStack, Release};
use crate::transport::{McpSession, McpTransport};
use crate::types::{
    McpPromptArgument, McpPromptInfo, McpResourceInfo, McpToolInfo, ResourceContent,
    ToolCallOutput,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::ServiceExt;
use rmcp::model::{
    CallToolRequestParam, GetPromptRequestParam, ReadResourceRequestParam, ResourceContents,
};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::RwLock;
use zdk_core::normalize_value;

type ClientService = RunningService<RoleClient, ()>;

/// Production transport: child-process stdio or streamable HTTP
#[derive(Debug, Clone, Copy, Default)]
pub struct RmcpTransport;

impl RmcpTransport {
    pub fn new() -> Self {
        Self
    }

    async fn spawn_stdio(server_id: &str, params: &StdioConnectionParams) -> Result<ClientService> {
        tracing::debug!(
            server = %server_id,
            command = %params.command,
            args = ?params.args,
            "Spawning MCP server process"
        );

        let mut command = Command::new(&params.command);
        command.args(&params.args).envs(&params.env);
        if let Some(cwd) = &params.cwd {
            command.current_dir(cwd);
        }

        let transport =
            TokioChildProcess::new(command).map_err(|e| McpError::connection(server_id, e))?;

        // `serve` runs the initialize handshake
        ().serve(transport)
            .await
            .map_err(|e| McpError::connection(server_id, e))
    }

    async fn open_http(server_id: &str, params: &HttpConnectionParams) -> Result<ClientService> {
        tracing::debug!(server = %server_id, url = %params.url, "Opening MCP HTTP stream");

        let mut headers = HeaderMap::new();
        for (name, value) in &params.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                McpError::invalid_config(server_id, format!("header name '{name}': {e}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                McpError::invalid_config(server_id, format!("header '{name}' value: {e}"))
            })?;
            headers.insert(header_name, header_value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(params.timeout)
            .read_timeout(params.sse_read_timeout)
            .build()
            .map_err(|e| McpError::connection(server_id, e))?;

        let transport = StreamableHttpClientTransport::with_client(
            client,
            StreamableHttpClientTransportConfig::with_uri(params.url.as_str()),
        );

        ().serve(transport)
            .await
            .map_err(|e| McpError::connection(server_id, e))
    }
}

#[async_trait]
impl McpTransport for RmcpTransport {
    async fn connect(
        &self,
        server_id: &str,
        config: &McpServerConfig,
        resources: &mut ExitStack,
    ) -> Result<Arc<dyn McpSession>> {
        let service = match &config.transport {
            TransportConfig::Stdio(params) => Self::spawn_stdio(server_id, params).await?,
            TransportConfig::Http(params) => Self::open_http(server_id, params).await?,
        };

        tracing::info!(
            server = %server_id,
            server_info = ?service.peer_info(),
            "MCP session initialized"
        );

        let session = Arc::new(RmcpSession::new(server_id, service));
        resources.push(format!("{server_id}/session"), session.clone());
        Ok(session)
    }
}

/// A live rmcp client session.
///
/// Requests share the service; release waits for them to finish and then
/// cancels it, which also ends the subprocess or stream.
pub struct RmcpSession {
    server_id: String,
    service: RwLock<Option<ClientService>>,
}

impl RmcpSession {
    fn new(server_id: &str, service: ClientService) -> Self {
        Self {
            server_id: server_id.to_string(),
            service: RwLock::new(Some(service)),
        }
    }

    fn closed(&self) -> McpError {
        McpError::NotConnected(self.server_id.clone())
    }

    fn protocol(&self, e: impl std::fmt::Display) -> McpError {
        McpError::protocol(&self.server_id, e)
    }
}

#[async_trait]
impl McpSession for RmcpSession {
    async fn list_tools(&self) -> Result<Vec<McpToolInfo>> {
        let guard = self.service.read().await;
        let service = guard.as_ref().ok_or_else(|| self.closed())?;

        let tools = service.list_all_tools().await.map_err(|e| self.protocol(e))?;

        Ok(tools
            .into_iter()
            .map(|tool| McpToolInfo {
                name: tool.name.into_owned(),
                description: tool.description.map(|d| d.into_owned()).unwrap_or_default(),
                input_schema: Value::Object((*tool.input_schema).clone()),
                output_schema: tool.output_schema.map(|s| Value::Object((*s).clone())),
            })
            .collect())
    }

    async fn list_resources(&self) -> Result<Vec<McpResourceInfo>> {
        let guard = self.service.read().await;
        let service = guard.as_ref().ok_or_else(|| self.closed())?;

        let resources = service
            .list_all_resources()
            .await
            .map_err(|e| self.protocol(e))?;

        Ok(resources
            .into_iter()
            .map(|resource| McpResourceInfo {
                uri: resource.raw.uri,
                name: resource.raw.name,
                description: resource.raw.description,
                mime_type: resource.raw.mime_type,
            })
            .collect())
    }

    async fn list_prompts(&self) -> Result<Vec<McpPromptInfo>> {
        let guard = self.service.read().await;
        let service = guard.as_ref().ok_or_else(|| self.closed())?;

        let prompts = service.list_all_prompts().await.map_err(|e| self.protocol(e))?;

        Ok(prompts
            .into_iter()
            .map(|prompt| McpPromptInfo {
                name: prompt.name,
                description: prompt.description,
                arguments: prompt
                    .arguments
                    .unwrap_or_default()
                    .into_iter()
                    .map(|arg| McpPromptArgument {
                        name: arg.name,
                        description: arg.description,
                        required: arg.required.unwrap_or(false),
                    })
                    .collect(),
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolCallOutput> {
        let guard = self.service.read().await;
        let service = guard.as_ref().ok_or_else(|| self.closed())?;

        let params = CallToolRequestParam {
            name: name.to_string().into(),
            arguments: Some(arguments),
        };
        let response = service.call_tool(params).await.map_err(|e| self.protocol(e))?;

        let content = response
            .content
            .into_iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ToolCallOutput {
            content,
            structured_content: response.structured_content,
            is_error: response.is_error.unwrap_or(false),
        })
    }

    async fn read_resource(&self, uri: &str) -> Result<ResourceContent> {
        let guard = self.service.read().await;
        let service = guard.as_ref().ok_or_else(|| self.closed())?;

        let response = service
            .read_resource(ReadResourceRequestParam {
                uri: uri.to_string(),
            })
            .await
            .map_err(|e| self.protocol(e))?;

        let mut mime_type = None;
        let mut parts = Vec::with_capacity(response.contents.len());
        for contents in response.contents {
            let (part_mime, part) = match contents {
                ResourceContents::TextResourceContents {
                    mime_type, text, ..
                } => (mime_type, text),
                ResourceContents::BlobResourceContents {
                    mime_type, blob, ..
                } => (mime_type, blob),
            };
            if mime_type.is_none() {
                mime_type = part_mime;
            }
            parts.push(part);
        }

        Ok(ResourceContent {
            content: parts.join("\n"),
            mime_type,
        })
    }

    async fn get_prompt(&self, name: &str, arguments: BTreeMap<String, String>) -> Result<String> {
        let guard = self.service.read().await;
        let service = guard.as_ref().ok_or_else(|| self.closed())?;

        let arguments: Map<String, Value> = arguments
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        let response = service
            .get_prompt(GetPromptRequestParam {
                name: name.to_string(),
                arguments: Some(arguments),
            })
            .await
            .map_err(|e| self.protocol(e))?;

        let mut rendered = Vec::with_capacity(response.messages.len());
        for message in &response.messages {
            let content = serde_json::to_value(&message.content)?;
            let text = match content.get("text").and_then(Value::as_str) {
                Some(text) => text.to_string(),
                None => normalize_value(&content),
            };
            rendered.push(text);
        }
        Ok(rendered.join("\n\n"))
    }
}

#[async_trait]
impl Release for RmcpSession {
    async fn release(&self) -> anyhow::Result<()> {
        let service = self.service.write().await.take();
        if let Some(service) = service {
            let reason = service.cancel().await?;
            tracing::debug!(server = %self.server_id, reason = ?reason, "MCP session closed");
        }
        Ok(())
    }
}

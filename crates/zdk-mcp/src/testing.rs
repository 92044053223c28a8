//! Deterministic MCP transport for tests
//!
//! [`ScriptedTransport`] never touches a process or socket. Each server id
//! follows a [`ServerScript`]; the transport counts connection attempts,
//! tool calls and open handles so tests can check retry bounds and leaks.

use crate::config::McpServerConfig;
use crate::error::{McpError, Result};
use crate::exit_stack::{ExitStack, Release};
use crate::transport::{McpSession, McpTransport};
use crate::types::{
    CatalogKind, McpPromptInfo, McpResourceInfo, McpToolInfo, ResourceContent, ToolCallOutput,
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use zdk_core::normalize_value;

/// How one scripted server behaves
#[derive(Debug, Clone)]
pub struct ServerScript {
    /// Attempts `1..=failing_attempts` fail after opening their transport
    pub failing_attempts: u32,
    /// Never finish connecting
    pub hang: bool,
    pub tools: Vec<McpToolInfo>,
    pub resources: Vec<McpResourceInfo>,
    pub prompts: Vec<McpPromptInfo>,
    /// Catalogs whose listing request fails
    pub broken_catalogs: Vec<CatalogKind>,
    /// Catalogs whose listing request never answers
    pub stalled_catalogs: Vec<CatalogKind>,
    /// Tools whose calls come back flagged as errors
    pub failing_tools: Vec<String>,
}

impl Default for ServerScript {
    /// A healthy server with a single `echo` tool
    fn default() -> Self {
        Self {
            failing_attempts: 0,
            hang: false,
            tools: vec![McpToolInfo::new("echo", "Echo the message back")],
            resources: Vec::new(),
            prompts: Vec::new(),
            broken_catalogs: Vec::new(),
            stalled_catalogs: Vec::new(),
            failing_tools: Vec::new(),
        }
    }
}

impl ServerScript {
    /// A server that refuses every connection attempt
    pub fn failing() -> Self {
        Self::default().fail_first(u32::MAX)
    }

    pub fn fail_first(mut self, attempts: u32) -> Self {
        self.failing_attempts = attempts;
        self
    }

    pub fn hang(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Replace the tool catalog
    pub fn tools(mut self, tools: Vec<McpToolInfo>) -> Self {
        self.tools = tools;
        self
    }

    pub fn resource(mut self, resource: McpResourceInfo) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn prompt(mut self, prompt: McpPromptInfo) -> Self {
        self.prompts.push(prompt);
        self
    }

    pub fn broken(mut self, kind: CatalogKind) -> Self {
        self.broken_catalogs.push(kind);
        self
    }

    pub fn stall(mut self, kind: CatalogKind) -> Self {
        self.stalled_catalogs.push(kind);
        self
    }

    pub fn failing_tool(mut self, name: impl Into<String>) -> Self {
        self.failing_tools.push(name.into());
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    live: AtomicUsize,
    peak: AtomicUsize,
    tool_calls: AtomicUsize,
}

/// Transport whose servers follow scripts
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: DashMap<String, ServerScript>,
    attempts: DashMap<String, u32>,
    counters: Arc<Counters>,
}

impl ScriptedTransport {
    /// Servers without a script behave like [`ServerScript::default`]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, server_id: impl Into<String>, script: ServerScript) -> Self {
        self.scripts.insert(server_id.into(), script);
        self
    }

    /// Connection attempts made so far for a server
    pub fn attempts(&self, server_id: &str) -> u32 {
        self.attempts.get(server_id).map(|a| *a).unwrap_or(0)
    }

    /// Handles currently open across all servers
    pub fn live_handles(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    /// Most handles ever open at the same time
    pub fn peak_live_handles(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Tool calls that reached a session
    pub fn tool_calls(&self) -> usize {
        self.counters.tool_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl McpTransport for ScriptedTransport {
    async fn connect(
        &self,
        server_id: &str,
        _config: &McpServerConfig,
        resources: &mut ExitStack,
    ) -> Result<Arc<dyn McpSession>> {
        let attempt = {
            let mut count = self.attempts.entry(server_id.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let script = self
            .scripts
            .get(server_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        resources.push(
            format!("{server_id}/transport"),
            Arc::new(ScriptedHandle::open(&self.counters)),
        );

        if script.hang {
            std::future::pending::<()>().await;
        }

        if attempt <= script.failing_attempts {
            return Err(McpError::connection(
                server_id,
                format!("scripted failure on attempt {attempt}"),
            ));
        }

        let session = Arc::new(ScriptedSession {
            server_id: server_id.to_string(),
            script,
            counters: self.counters.clone(),
            handle: ScriptedHandle::open(&self.counters),
        });
        resources.push(format!("{server_id}/session"), session.clone());
        Ok(session)
    }
}

/// Counts itself as open until released once
#[derive(Debug)]
struct ScriptedHandle {
    counters: Arc<Counters>,
    released: AtomicBool,
}

impl ScriptedHandle {
    fn open(counters: &Arc<Counters>) -> Self {
        let live = counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak.fetch_max(live, Ordering::SeqCst);
        Self {
            counters: counters.clone(),
            released: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Release for ScriptedHandle {
    async fn release(&self) -> anyhow::Result<()> {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Session answering from its script.
///
/// Tools echo their `message` argument, or the JSON of all arguments when
/// there is none.
#[derive(Debug)]
pub struct ScriptedSession {
    server_id: String,
    script: ServerScript,
    counters: Arc<Counters>,
    handle: ScriptedHandle,
}

impl ScriptedSession {
    async fn listing<T: Clone>(&self, kind: CatalogKind, items: &[T]) -> Result<Vec<T>> {
        if self.script.stalled_catalogs.contains(&kind) {
            std::future::pending::<()>().await;
        }
        if self.script.broken_catalogs.contains(&kind) {
            return Err(McpError::protocol(
                &self.server_id,
                format!("{kind}/list failed"),
            ));
        }
        Ok(items.to_vec())
    }
}

#[async_trait]
impl McpSession for ScriptedSession {
    async fn list_tools(&self) -> Result<Vec<McpToolInfo>> {
        self.listing(CatalogKind::Tools, &self.script.tools).await
    }

    async fn list_resources(&self) -> Result<Vec<McpResourceInfo>> {
        self.listing(CatalogKind::Resources, &self.script.resources).await
    }

    async fn list_prompts(&self) -> Result<Vec<McpPromptInfo>> {
        self.listing(CatalogKind::Prompts, &self.script.prompts).await
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolCallOutput> {
        self.counters.tool_calls.fetch_add(1, Ordering::SeqCst);

        if self.script.failing_tools.iter().any(|t| t == name) {
            return Ok(ToolCallOutput {
                is_error: true,
                ..ToolCallOutput::text(format!("{name} failed on purpose"))
            });
        }

        let text = match arguments.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => normalize_value(&Value::Object(arguments)),
        };
        Ok(ToolCallOutput::text(text))
    }

    async fn read_resource(&self, uri: &str) -> Result<ResourceContent> {
        let resource = self
            .script
            .resources
            .iter()
            .find(|r| r.uri == uri)
            .ok_or_else(|| McpError::protocol(&self.server_id, format!("no resource {uri}")))?;

        Ok(ResourceContent {
            content: format!("contents of {}", resource.name),
            mime_type: resource.mime_type.clone(),
        })
    }

    async fn get_prompt(&self, name: &str, arguments: BTreeMap<String, String>) -> Result<String> {
        let rendered: Vec<String> = arguments
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        Ok(format!("{name}({})", rendered.join(", ")))
    }
}

#[async_trait]
impl Release for ScriptedSession {
    async fn release(&self) -> anyhow::Result<()> {
        self.handle.release().await
    }
}

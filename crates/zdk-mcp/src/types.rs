//! Types for MCP integration

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use zdk_core::normalize_value;

/// Information about an MCP tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

impl McpToolInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
            output_schema: None,
        }
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Information about an MCP resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpResourceInfo {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// A named argument a prompt template accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpPromptArgument {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Information about an MCP prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpPromptInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub arguments: Vec<McpPromptArgument>,
}

/// Raw result of a remote tool call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallOutput {
    /// Content blocks as the server sent them (`{"type": "text", ...}` etc.)
    pub content: Vec<Value>,
    pub structured_content: Option<Value>,
    pub is_error: bool,
}

impl ToolCallOutput {
    /// Single text block result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![serde_json::json!({"type": "text", "text": text.into()})],
            ..Default::default()
        }
    }

    /// Flatten the result into one string.
    ///
    /// All-text content is joined with newlines; anything else is the JSON
    /// form of the structured content if present, else of the blocks.
    pub fn render(&self) -> String {
        let texts: Option<Vec<&str>> = self
            .content
            .iter()
            .map(|block| match block.get("type").and_then(Value::as_str) {
                Some("text") => block.get("text").and_then(Value::as_str),
                _ => None,
            })
            .collect();

        match (texts, &self.structured_content) {
            (Some(texts), _) if !texts.is_empty() => texts.join("\n"),
            (_, Some(structured)) => normalize_value(structured),
            _ => normalize_value(&Value::Array(self.content.clone())),
        }
    }
}

/// Content returned by `resources/read`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceContent {
    pub content: String,
    pub mime_type: Option<String>,
}

/// Catalog kinds listed during discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Tools,
    Resources,
    Prompts,
}

impl CatalogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Tools => "tools",
            CatalogKind::Resources => "resources",
            CatalogKind::Prompts => "prompts",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a connected server offers; replaced wholesale on each connect
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub tools: BTreeMap<String, McpToolInfo>,
    /// Keyed by URI
    pub resources: BTreeMap<String, McpResourceInfo>,
    pub prompts: BTreeMap<String, McpPromptInfo>,
}

impl Catalog {
    pub fn new(
        tools: Vec<McpToolInfo>,
        resources: Vec<McpResourceInfo>,
        prompts: Vec<McpPromptInfo>,
    ) -> Self {
        Self {
            tools: tools.into_iter().map(|t| (t.name.clone(), t)).collect(),
            resources: resources.into_iter().map(|r| (r.uri.clone(), r)).collect(),
            prompts: prompts.into_iter().map(|p| (p.name.clone(), p)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.resources.is_empty() && self.prompts.is_empty()
    }
}

/// Lifecycle state of one server connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Last connect exhausted its retries; connecting again is allowed
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        };
        f.write_str(label)
    }
}

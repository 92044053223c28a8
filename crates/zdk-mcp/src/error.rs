//! Error types for MCP server configuration, connection and invocation.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors raised while configuring, connecting to or calling MCP servers.
#[derive(Error, Debug)]
pub enum McpError {
    /// Server configuration file does not exist
    #[error("MCP config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Configuration document has no top-level `servers` key
    #[error("MCP config is missing the top-level 'servers' key")]
    MissingServersKey,

    /// Configuration file extension is not YAML or JSON
    #[error("Unsupported MCP config format '{0}' (expected .yaml, .yml or .json)")]
    UnsupportedFormat(String),

    /// One server entry cannot be turned into a connection config
    #[error("Invalid config for MCP server '{server}': {reason}")]
    InvalidConfig { server: String, reason: String },

    #[error("MCP server '{0}' is already configured")]
    DuplicateServer(String),

    #[error("MCP server '{0}' is not configured")]
    UnknownServer(String),

    #[error("MCP server '{0}' is not connected")]
    NotConnected(String),

    #[error("MCP server '{server}' has no tool '{tool}'")]
    UnknownTool { server: String, tool: String },

    #[error("MCP server '{server}' has no resource '{uri}'")]
    UnknownResource { server: String, uri: String },

    #[error("MCP server '{server}' has no prompt '{prompt}'")]
    UnknownPrompt { server: String, prompt: String },

    #[error("Invalid arguments for '{target}': {reason}")]
    InvalidArguments { target: String, reason: String },

    /// Transport could not be opened or the handshake failed
    #[error("Connection to MCP server '{server}' failed: {reason}")]
    Connection { server: String, reason: String },

    #[error("MCP server '{server}' did not answer within {timeout:?}")]
    Timeout { server: String, timeout: Duration },

    /// The remote tool ran and reported an error result
    #[error("MCP tool '{tool}' reported an error: {message}")]
    ToolFailed { tool: String, message: String },

    /// Request failed at the protocol level after the session was established
    #[error("MCP protocol error on '{server}': {reason}")]
    Protocol { server: String, reason: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl McpError {
    pub(crate) fn connection(server: &str, reason: impl std::fmt::Display) -> Self {
        McpError::Connection {
            server: server.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn protocol(server: &str, reason: impl std::fmt::Display) -> Self {
        McpError::Protocol {
            server: server.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_config(server: &str, reason: impl Into<String>) -> Self {
        McpError::InvalidConfig {
            server: server.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether a retry could succeed where this attempt failed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            McpError::Connection { .. } | McpError::Timeout { .. } | McpError::IoError(_)
        )
    }
}

impl From<McpError> for zdk_core::Error {
    fn from(err: McpError) -> Self {
        zdk_core::Error::Other(anyhow::Error::new(err))
    }
}

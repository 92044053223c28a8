//! MCP (Model Context Protocol) integration for ZDK
//!
//! This crate connects to external MCP servers using the official rmcp Rust
//! SDK, discovers their tools, resources and prompts, and exposes each live
//! server as a toolset next to the native ones.
//!
//! - [`McpServer`] is one connection and its connect/discover/call/disconnect
//!   lifecycle
//! - [`McpToolChest`] holds server configuration, connects servers
//!   concurrently and binds every connected server to a toolset
//! - [`McpTransport`] / [`McpSession`] are the seam between the lifecycle and
//!   the wire; [`RmcpTransport`] is the production implementation

pub mod chest;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod exit_stack;
pub mod fanout;
pub mod retry;
pub mod server;
pub mod testing;
pub mod tool_wrapper;
pub mod toolset;
pub mod transport;
pub mod types;

// Re-exports
pub use chest::McpToolChest;
pub use client::{RmcpSession, RmcpTransport};
pub use config::{McpServerConfig, TransportConfig, parse_config_file, validate_server_id};
pub use connection::{HttpConnectionParams, StdioConnectionParams};
pub use error::{McpError, Result};
pub use exit_stack::{ExitStack, Release};
pub use fanout::fan_out;
pub use retry::RetryPolicy;
pub use server::McpServer;
pub use tool_wrapper::McpToolWrapper;
pub use toolset::{McpToolset, SERVER_TOOLSET_PREFIX, server_id_from_toolset, server_toolset_name};
pub use transport::{McpSession, McpTransport};
pub use types::{
    Catalog, CatalogKind, ConnectionState, McpPromptArgument, McpPromptInfo, McpResourceInfo,
    McpToolInfo, ResourceContent, ToolCallOutput,
};

//! Core traits and types for ZDK
//!
//! This crate provides the shared abstractions of the tool capability runtime:
//! the `Tool` trait, tool-call and content types, the vendor format tag,
//! configuration loading and the common error type.

pub mod config;
pub mod content;
pub mod context;
pub mod error;
pub mod format;
pub mod traits;

// Re-exports
pub use config::{AgentConfig, McpConfig, ObservabilityConfig, ToolsetsConfig, ZConfig};
pub use content::{Content, FunctionCall, FunctionResponse, Part, ToolCall, normalize_value};
pub use context::ToolContext;
pub use error::{Error, Result};
pub use format::VendorFormat;
pub use traits::{Tool, ToolResponse};

//! Tool system for ZDK
//!
//! This crate provides the in-process side of the tool runtime:
//! - Function tools with explicit or schemars-generated parameter schemas
//! - The process-wide toolset registry and toolset instances
//! - `ToolChest`, which activates toolsets and dispatches tool calls
//! - Vendor-specific formatting of tool calls and results
//! - Built-in toolsets (echo, calculator)

pub mod builtin;
pub mod chest;
pub mod context;
pub mod dispatch;
pub mod function_tool;
pub mod registry;
pub mod schema;
pub mod toolset;

// Re-exports
pub use chest::ToolChest;
pub use context::DefaultToolContext;
pub use dispatch::{
    ClaudeBlock, ClaudeMessage, DispatchOutput, GptFunction, GptMessage, GptToolCall, ToolOutcome,
};
pub use function_tool::FunctionTool;
pub use registry::{ToolsetDescriptor, ToolsetRegistry};
pub use schema::{ToolSchema, ToolSchemaDescriptor, generate_schema, parameters_schema};
pub use toolset::{TOOL_NAME_SEPARATOR, Toolset, qualify, split_qualified};

// Re-export core types
pub use zdk_core::{Result, Tool, ToolContext, ToolResponse};

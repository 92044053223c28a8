//! # ZDK Telemetry
//!
//! Structured logging and OpenTelemetry tracing for the tool runtime.
//!
//! Spans are recorded for every dispatched tool call and every MCP connection
//! attempt, using the OpenTelemetry generative-AI semantic conventions where
//! they exist and `mcp.*` attributes otherwise.

mod spans;
mod tracer;

pub use spans::{
    McpSpanAttributes, ToolSpanAttributes, safe_serialize, trace_mcp_connect, trace_tool_call,
};
pub use tracer::{TelemetryConfig, init_telemetry, tracer_provider};

/// OpenTelemetry span attribute names.
pub mod attributes {
    // Generic AI attributes
    pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";
    pub const GEN_AI_SYSTEM: &str = "gen_ai.system";
    pub const GEN_AI_TOOL_NAME: &str = "gen_ai.tool.name";
    pub const GEN_AI_TOOL_CALL_ID: &str = "gen_ai.tool.call.id";

    // Tool chest attributes
    pub const ZDK_TOOLSET_NAME: &str = "zdk.toolset.name";
    pub const ZDK_INVOCATION_ID: &str = "zdk.invocation_id";
    pub const ZDK_VENDOR_FORMAT: &str = "zdk.vendor_format";
    pub const ZDK_TOOL_CALL_ARGS: &str = "zdk.tool_call_args";
    pub const ZDK_TOOL_RESPONSE: &str = "zdk.tool_response";
    pub const ZDK_TOOL_IS_ERROR: &str = "zdk.tool_is_error";

    // MCP connection attributes
    pub const MCP_SERVER_ID: &str = "mcp.server.id";
    pub const MCP_TRANSPORT: &str = "mcp.transport";
    pub const MCP_ATTEMPT: &str = "mcp.connect.attempt";
    pub const MCP_OUTCOME: &str = "mcp.connect.outcome";

    // System name constant
    pub const SYSTEM_NAME: &str = "zdk.toolchest";
}

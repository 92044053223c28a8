//! Span creation helpers for tool executions and MCP connection attempts

use crate::attributes::*;

/// Attributes for tracing a tool call
#[derive(Debug, Clone)]
pub struct ToolSpanAttributes {
    pub tool_name: String,
    pub toolset: String,
    pub tool_call_id: String,
    pub invocation_id: String,
    pub vendor_format: String,
    pub args_json: String,
    pub response_json: String,
    pub is_error: bool,
}

/// Attributes for tracing one MCP connection attempt
#[derive(Debug, Clone)]
pub struct McpSpanAttributes {
    pub server_id: String,
    pub transport: String,
    pub attempt: u32,
    pub outcome: String,
}

/// Record a span for a dispatched tool execution.
///
/// The span carries the qualified tool name, the owning toolset, the vendor
/// call id and the argument/response payloads so a trace backend can
/// reconstruct the exchange.
pub fn trace_tool_call(attrs: ToolSpanAttributes) {
    let span = tracing::info_span!(
        "execute_tool",
        { GEN_AI_OPERATION_NAME } = "execute_tool",
        { GEN_AI_SYSTEM } = SYSTEM_NAME,
        { GEN_AI_TOOL_NAME } = %attrs.tool_name,
        { GEN_AI_TOOL_CALL_ID } = %attrs.tool_call_id,
        { ZDK_TOOLSET_NAME } = %attrs.toolset,
        { ZDK_INVOCATION_ID } = %attrs.invocation_id,
        { ZDK_VENDOR_FORMAT } = %attrs.vendor_format,
        { ZDK_TOOL_CALL_ARGS } = %attrs.args_json,
        { ZDK_TOOL_RESPONSE } = %attrs.response_json,
        { ZDK_TOOL_IS_ERROR } = attrs.is_error,
    );

    let _guard = span.enter();
}

/// Record a span for one MCP connection attempt.
pub fn trace_mcp_connect(attrs: McpSpanAttributes) {
    let span = tracing::info_span!(
        "mcp_connect",
        { GEN_AI_SYSTEM } = SYSTEM_NAME,
        { MCP_SERVER_ID } = %attrs.server_id,
        { MCP_TRANSPORT } = %attrs.transport,
        { MCP_ATTEMPT } = attrs.attempt,
        { MCP_OUTCOME } = %attrs.outcome,
    );

    let _guard = span.enter();
}

/// Helper to safely serialize to JSON string
pub fn safe_serialize<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<not serializable>".to_string())
}

use crate::FunctionTool;
use schemars::JsonSchema;
use serde::Deserialize;
use zdk_core::{Result, ToolResponse};

/// Name of the toolset holding the echo tool
pub const ECHO_TOOLSET: &str = "echo";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EchoParams {
    /// Message to echo back
    pub message: String,
}

/// Tool that answers with its own message and call identifiers.
///
/// Handy for checking that dispatch routes calls and contexts correctly.
pub fn create_echo_tool() -> Result<FunctionTool> {
    FunctionTool::builder()
        .name("echo")
        .description("Echoes back the provided message. Useful for testing tool execution.")
        .params::<EchoParams>()
        .handler(|ctx, params: EchoParams| async move {
            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                tool_call_id = %ctx.function_call_id(),
                "Echo tool called"
            );

            Ok(ToolResponse::new(serde_json::json!({
                "message": params.message,
                "invocation_id": ctx.invocation_id(),
                "function_call_id": ctx.function_call_id(),
            })))
        })
        .build()
}

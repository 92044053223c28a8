//! Tool-call dispatch and vendor message formatting
//!
//! A batch of tool calls is resolved against the active toolsets, executed
//! concurrently, and rendered as the message pair a vendor API expects:
//!
//! - claude: one assistant message with `tool_use` blocks, one user message
//!   with a `tool_result` block per call
//! - gpt: one assistant message with `tool_calls`, one `tool` message per call
//! - gemini: one model content with `functionCall` parts, one user content
//!   with `functionResponse` parts
//!
//! A failing call never aborts its siblings; it produces an error-flavored
//! result in the same shape as a success.

use crate::chest::ToolChest;
use crate::context::DefaultToolContext;
use crate::toolset::split_qualified;
use futures::FutureExt;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use zdk_core::{
    Content, FunctionCall, FunctionResponse, Part, ToolCall, VendorFormat, normalize_value,
};
use zdk_telemetry::{ToolSpanAttributes, safe_serialize, trace_tool_call};

/// Result of executing one tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub call: ToolCall,
    /// Rendered result, or the failure message when `is_error` is set
    pub content: String,
    pub is_error: bool,
}

impl ToolOutcome {
    fn success(call: ToolCall, content: String) -> Self {
        Self {
            call,
            content,
            is_error: false,
        }
    }

    fn failure(call: ToolCall, reason: impl std::fmt::Display) -> Self {
        let content = format!("Tool {} failed: {}", call.name, reason);
        Self {
            call,
            content,
            is_error: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaudeMessage {
    pub role: String,
    pub content: Vec<ClaudeBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeBlock {
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GptMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<GptToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GptToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: GptFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GptFunction {
    pub name: String,
    /// JSON-encoded arguments, as the chat completions API sends them
    pub arguments: String,
}

/// Messages produced for one dispatched batch
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DispatchOutput {
    Claude(Vec<ClaudeMessage>),
    Gpt(Vec<GptMessage>),
    Gemini(Vec<Content>),
}

impl DispatchOutput {
    /// Render outcomes in the requested vendor shape
    pub fn format(outcomes: &[ToolOutcome], format: VendorFormat) -> Self {
        match format {
            VendorFormat::Claude => DispatchOutput::Claude(claude_messages(outcomes)),
            VendorFormat::Gpt => DispatchOutput::Gpt(gpt_messages(outcomes)),
            VendorFormat::Gemini => DispatchOutput::Gemini(gemini_contents(outcomes)),
        }
    }

    /// Messages as JSON values, ready to append to a conversation
    pub fn to_values(&self) -> Vec<Value> {
        match self {
            DispatchOutput::Claude(messages) => messages.iter().map(to_value).collect(),
            DispatchOutput::Gpt(messages) => messages.iter().map(to_value).collect(),
            DispatchOutput::Gemini(contents) => contents.iter().map(to_value).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DispatchOutput::Claude(messages) => messages.len(),
            DispatchOutput::Gpt(messages) => messages.len(),
            DispatchOutput::Gemini(contents) => contents.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn to_value<T: Serialize>(message: &T) -> Value {
    serde_json::to_value(message).unwrap_or(Value::Null)
}

fn claude_messages(outcomes: &[ToolOutcome]) -> Vec<ClaudeMessage> {
    let uses = outcomes
        .iter()
        .map(|o| ClaudeBlock::ToolUse {
            id: o.call.id.clone(),
            name: o.call.name.clone(),
            input: arguments_object(&o.call.arguments),
        })
        .collect();
    let results = outcomes
        .iter()
        .map(|o| ClaudeBlock::ToolResult {
            tool_use_id: o.call.id.clone(),
            content: o.content.clone(),
            is_error: o.is_error,
        })
        .collect();

    vec![
        ClaudeMessage {
            role: "assistant".to_string(),
            content: uses,
        },
        ClaudeMessage {
            role: "user".to_string(),
            content: results,
        },
    ]
}

fn gpt_messages(outcomes: &[ToolOutcome]) -> Vec<GptMessage> {
    let tool_calls = outcomes
        .iter()
        .map(|o| GptToolCall {
            id: o.call.id.clone(),
            kind: "function".to_string(),
            function: GptFunction {
                name: o.call.name.clone(),
                arguments: safe_serialize(&arguments_object(&o.call.arguments)),
            },
        })
        .collect();

    let mut messages = Vec::with_capacity(outcomes.len() + 1);
    messages.push(GptMessage {
        role: "assistant".to_string(),
        content: None,
        tool_calls: Some(tool_calls),
        tool_call_id: None,
    });
    messages.extend(outcomes.iter().map(|o| GptMessage {
        role: "tool".to_string(),
        content: Some(o.content.clone()),
        tool_calls: None,
        tool_call_id: Some(o.call.id.clone()),
    }));
    messages
}

fn gemini_contents(outcomes: &[ToolOutcome]) -> Vec<Content> {
    let calls = outcomes
        .iter()
        .map(|o| Part::FunctionCall {
            function_call: FunctionCall {
                name: o.call.name.clone(),
                args: arguments_object(&o.call.arguments),
                id: Some(o.call.id.clone()),
            },
        })
        .collect();
    let responses = outcomes
        .iter()
        .map(|o| {
            let response = if o.is_error {
                json!({ "error": o.content })
            } else {
                json!({ "result": o.content })
            };
            Part::FunctionResponse {
                function_response: FunctionResponse {
                    name: o.call.name.clone(),
                    response,
                    id: Some(o.call.id.clone()),
                },
            }
        })
        .collect();

    vec![
        Content {
            role: "model".to_string(),
            parts: calls,
        },
        Content {
            role: "user".to_string(),
            parts: responses,
        },
    ]
}

fn arguments_object(arguments: &Value) -> Value {
    if arguments.is_null() {
        json!({})
    } else {
        arguments.clone()
    }
}

impl ToolChest {
    /// Execute a batch of tool calls and format the exchange for `format`.
    ///
    /// Calls run concurrently; outcomes keep request order.
    pub async fn dispatch(&self, calls: &[ToolCall], format: VendorFormat) -> DispatchOutput {
        let outcomes = self.execute_calls(calls, format).await;
        DispatchOutput::format(&outcomes, format)
    }

    /// Execute a batch of tool calls without formatting
    pub async fn execute_calls(&self, calls: &[ToolCall], format: VendorFormat) -> Vec<ToolOutcome> {
        let invocation_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(
            invocation_id = %invocation_id,
            calls = calls.len(),
            vendor = %format,
            "Dispatching tool calls"
        );

        join_all(calls.iter().map(|call| {
            let invocation_id = invocation_id.as_str();
            async move {
                let outcome = AssertUnwindSafe(self.execute_call(call, invocation_id))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| ToolOutcome::failure(call.clone(), "tool panicked"));

                trace_tool_call(ToolSpanAttributes {
                    tool_name: call.name.clone(),
                    toolset: split_qualified(&call.name)
                        .map(|(toolset, _)| toolset.to_string())
                        .unwrap_or_default(),
                    tool_call_id: call.id.clone(),
                    invocation_id: invocation_id.to_string(),
                    vendor_format: format.to_string(),
                    args_json: safe_serialize(&call.arguments),
                    response_json: outcome.content.clone(),
                    is_error: outcome.is_error,
                });
                outcome
            }
        }))
        .await
    }

    /// Resolve and execute a single call.
    ///
    /// Never fails: resolution and execution errors become error outcomes.
    pub async fn execute_call(&self, call: &ToolCall, invocation_id: &str) -> ToolOutcome {
        let Some((toolset_name, operation)) = split_qualified(&call.name) else {
            return ToolOutcome::failure(call.clone(), "not a qualified tool name");
        };

        let Some(toolset) = self.get_toolset(toolset_name) else {
            tracing::warn!(tool = %call.name, toolset = %toolset_name, "Toolset is not active");
            return ToolOutcome::failure(
                call.clone(),
                format!("toolset '{toolset_name}' is not active"),
            );
        };

        if let Some(reason) = toolset.invalid_reason() {
            return ToolOutcome::failure(
                call.clone(),
                format!("toolset '{toolset_name}' is unavailable ({reason})"),
            );
        }

        let ctx = Arc::new(DefaultToolContext::new(call.id.clone(), invocation_id));
        match toolset.call(ctx, operation, call.arguments.clone()).await {
            Ok(response) => ToolOutcome::success(call.clone(), normalize_value(&response.result)),
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                ToolOutcome::failure(call.clone(), e)
            }
        }
    }
}

//! Vendor format tag for tool-call exchanges

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Message shape a specific LLM vendor expects for tool calls and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorFormat {
    /// Anthropic messages: `tool_use` / `tool_result` content blocks
    #[default]
    #[serde(alias = "anthropic")]
    Claude,
    /// OpenAI chat completions: `tool_calls` plus `tool` role messages
    #[serde(alias = "openai")]
    Gpt,
    /// Gemini contents: `functionCall` / `functionResponse` parts
    Gemini,
}

impl VendorFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorFormat::Claude => "claude",
            VendorFormat::Gpt => "gpt",
            VendorFormat::Gemini => "gemini",
        }
    }
}

impl fmt::Display for VendorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VendorFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Ok(VendorFormat::Claude),
            "gpt" | "openai" => Ok(VendorFormat::Gpt),
            "gemini" => Ok(VendorFormat::Gemini),
            other => Err(Error::config_error(format!(
                "Unsupported vendor format '{other}' (expected claude, gpt or gemini)"
            ))),
        }
    }
}

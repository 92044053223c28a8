//! Configuration management for ZDK
//!
//! Loads configuration with priority:
//! 1. config.toml (or specified config file)
//! 2. Environment variables referenced as `${VAR_NAME}`
//! 3. Defaults

use crate::VendorFormat;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// ZDK configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZConfig {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub mcp: McpConfig,

    #[serde(default)]
    pub toolsets: ToolsetsConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// What the agent on the other side of the tool chest can do
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Message shape used when formatting tool calls and results
    #[serde(default)]
    pub vendor: VendorFormat,

    /// Whether the agent can invoke tools at all
    #[serde(default = "default_true")]
    pub tool_use: bool,
}

/// MCP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Path of the YAML/JSON file listing MCP servers
    pub config_path: Option<String>,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Toolsets activated at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsetsConfig {
    #[serde(default)]
    pub default: Vec<String>,
}

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub service_name: Option<String>,

    /// Emit log lines as JSON instead of plain text
    #[serde(default)]
    pub json_logs: bool,

    /// `EnvFilter` directive, e.g. `info,zdk_mcp=debug`
    pub filter: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            vendor: VendorFormat::default(),
            tool_use: true,
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ZConfig {
    /// Load configuration with the following priority:
    /// 1. config.toml in current directory or a parent
    /// 2. Environment variables (for `${VAR}` references)
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            Self::find_config_file()?
        };

        tracing::debug!("Loading configuration from: {:?}", config_path);

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))
    }

    /// Parse configuration from TOML text and resolve `${VAR}` references
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: ZConfig = toml::from_str(contents)?;
        config.resolve_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Load test configuration (config.test.toml)
    pub fn load_test() -> Result<Self> {
        let test_config = PathBuf::from("config.test.toml");
        if test_config.exists() {
            Self::load_from(Some(&test_config))
        } else {
            Ok(Self::test_defaults())
        }
    }

    /// Find config.toml by searching current directory and parents
    fn find_config_file() -> Result<PathBuf> {
        let mut current = env::current_dir()?;

        loop {
            let config_path = current.join("config.toml");
            if config_path.exists() {
                return Ok(config_path);
            }

            if !current.pop() {
                break;
            }
        }

        Err(anyhow!(
            "config.toml not found. Create one with: cp config.toml.example config.toml"
        ))
    }

    fn resolve_env_vars(&mut self) {
        if let Some(ref path) = self.mcp.config_path {
            self.mcp.config_path = resolve_env_var(path);
        }
        if let Some(ref name) = self.observability.service_name {
            self.observability.service_name = resolve_env_var(name);
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.mcp.retry_delay_secs.is_finite() || self.mcp.retry_delay_secs < 0.0 {
            return Err(anyhow!(
                "mcp.retry_delay_secs must be a non-negative number, got {}",
                self.mcp.retry_delay_secs
            ));
        }
        Ok(())
    }

    /// Create test-friendly defaults (no files or environment required)
    pub fn test_defaults() -> Self {
        Self {
            agent: AgentConfig::default(),
            mcp: McpConfig {
                config_path: None,
                max_retries: 2,
                retry_delay_secs: 0.0,
                connect_timeout_secs: 5,
            },
            toolsets: ToolsetsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Resolve a single `${VAR_NAME}` reference.
///
/// Plain values are returned unchanged; a reference to an unset variable
/// resolves to `None`.
pub fn resolve_env_var(value: &str) -> Option<String> {
    match value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(var_name) => env::var(var_name).ok(),
        None => Some(value.to_string()),
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> f64 {
    1.0
}

fn default_connect_timeout_secs() -> u64 {
    30
}

//! MCP server configuration
//!
//! Server files are YAML or JSON documents with a top-level `servers` map:
//!
//! ```yaml
//! servers:
//!   files:
//!     command: npx
//!     args: ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]
//!   search:
//!     url: http://localhost:8931/mcp
//!     headers:
//!       Authorization: "Bearer ${SEARCH_TOKEN}"
//!     max_retries: 5
//! ```

use crate::connection::{HttpConnectionParams, StdioConnectionParams};
use crate::error::{McpError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use zdk_core::config::resolve_env_var;
use zdk_tool::TOOL_NAME_SEPARATOR;

/// How to reach one MCP server
#[derive(Debug, Clone, PartialEq)]
pub enum TransportConfig {
    /// Spawn a subprocess and speak MCP over its stdin/stdout
    Stdio(StdioConnectionParams),
    /// Connect to a remote server over HTTP with an SSE event stream
    Http(HttpConnectionParams),
}

impl TransportConfig {
    /// Short transport label used in logs and spans
    pub fn kind(&self) -> &'static str {
        match self {
            TransportConfig::Stdio(_) => "stdio",
            TransportConfig::Http(_) => "http",
        }
    }
}

/// Immutable configuration of one MCP server
#[derive(Debug, Clone, PartialEq)]
pub struct McpServerConfig {
    pub transport: TransportConfig,
    /// Overrides the chest-wide retry count
    pub max_retries: Option<u32>,
    /// Overrides the chest-wide delay between attempts
    pub retry_delay: Option<Duration>,
    /// Overrides the chest-wide per-attempt timeout
    pub connect_timeout: Option<Duration>,
    /// Only these tools are exposed when set
    pub tools: Option<Vec<String>>,
}

impl McpServerConfig {
    pub fn stdio(params: StdioConnectionParams) -> Self {
        Self::with_transport(TransportConfig::Stdio(params))
    }

    pub fn http(params: HttpConnectionParams) -> Self {
        Self::with_transport(TransportConfig::Http(params))
    }

    fn with_transport(transport: TransportConfig) -> Self {
        Self {
            transport,
            max_retries: None,
            retry_delay: None,
            connect_timeout: None,
            tools: None,
        }
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Restrict the exposed tools to an allow-list
    pub fn tool_filter<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    /// Whether a discovered tool passes the allow-list
    pub fn exposes(&self, tool: &str) -> bool {
        self.tools
            .as_ref()
            .is_none_or(|allowed| allowed.iter().any(|name| name == tool))
    }
}

/// One entry of the `servers` map as written in the file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServerConfig {
    transport: Option<String>,
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
    url: Option<String>,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default, with = "opt_secs")]
    timeout: Option<Duration>,
    #[serde(default, with = "opt_secs")]
    sse_read_timeout: Option<Duration>,
    max_retries: Option<u32>,
    #[serde(default, with = "opt_secs")]
    retry_delay: Option<Duration>,
    #[serde(default, with = "opt_secs")]
    connect_timeout: Option<Duration>,
    tools: Option<Vec<String>>,
}

mod opt_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        #[derive(Deserialize)]
        struct Secs(#[serde(with = "crate::connection::secs_f64")] Duration);

        Ok(Option::<Secs>::deserialize(deserializer)?.map(|Secs(d)| d))
    }
}

impl McpServerConfig {
    fn from_raw(server_id: &str, raw: RawServerConfig) -> Result<Self> {
        let kind = match (raw.transport.as_deref(), &raw.command, &raw.url) {
            (Some(explicit), _, _) => explicit.to_ascii_lowercase(),
            (None, Some(_), None) => "stdio".to_string(),
            (None, None, Some(_)) => "http".to_string(),
            (None, Some(_), Some(_)) => {
                return Err(McpError::invalid_config(
                    server_id,
                    "both 'command' and 'url' are set; choose one with 'transport'",
                ));
            }
            (None, None, None) => {
                return Err(McpError::invalid_config(
                    server_id,
                    "expected 'command' (stdio) or 'url' (http)",
                ));
            }
        };

        let transport = match kind.as_str() {
            "stdio" => {
                let command = raw.command.ok_or_else(|| {
                    McpError::invalid_config(server_id, "stdio transport requires 'command'")
                })?;
                TransportConfig::Stdio(StdioConnectionParams {
                    command,
                    args: raw.args,
                    env: resolve_values(server_id, raw.env),
                    cwd: raw.cwd,
                })
            }
            "http" | "sse" | "streamable_http" => {
                let url = raw.url.ok_or_else(|| {
                    McpError::invalid_config(server_id, format!("{kind} transport requires 'url'"))
                })?;
                let mut params = HttpConnectionParams::new(url);
                params.headers = resolve_values(server_id, raw.headers);
                if let Some(timeout) = raw.timeout {
                    params.timeout = timeout;
                }
                if let Some(timeout) = raw.sse_read_timeout {
                    params.sse_read_timeout = timeout;
                }
                TransportConfig::Http(params)
            }
            other => {
                return Err(McpError::invalid_config(
                    server_id,
                    format!("unknown transport '{other}'"),
                ));
            }
        };

        Ok(Self {
            transport,
            max_retries: raw.max_retries,
            retry_delay: raw.retry_delay,
            connect_timeout: raw.connect_timeout,
            tools: raw.tools,
        })
    }
}

/// Resolve `${VAR}` references; entries naming an unset variable are dropped
fn resolve_values(server_id: &str, values: HashMap<String, String>) -> HashMap<String, String> {
    values
        .into_iter()
        .filter_map(|(key, value)| match resolve_env_var(&value) {
            Some(resolved) => Some((key, resolved)),
            None => {
                tracing::warn!(
                    server = %server_id,
                    key = %key,
                    reference = %value,
                    "Environment reference is not set; dropping entry"
                );
                None
            }
        })
        .collect()
}

/// Check that a server id can be used inside qualified tool names
pub fn validate_server_id(server_id: &str) -> Result<()> {
    if server_id.trim().is_empty() {
        return Err(McpError::invalid_config(server_id, "server id is empty"));
    }
    if server_id.contains(TOOL_NAME_SEPARATOR) {
        return Err(McpError::invalid_config(
            server_id,
            format!("server id may not contain '{TOOL_NAME_SEPARATOR}'"),
        ));
    }
    if server_id.chars().any(char::is_whitespace) {
        return Err(McpError::invalid_config(
            server_id,
            "server id may not contain whitespace",
        ));
    }
    Ok(())
}

/// Parse a server file into server configurations keyed by id.
///
/// No connection is attempted.
pub fn parse_config_file(path: &Path) -> Result<BTreeMap<String, McpServerConfig>> {
    if !path.exists() {
        return Err(McpError::ConfigNotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let contents = std::fs::read_to_string(path)?;
    let document: Value = match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)?,
        "json" => serde_json::from_str(&contents)?,
        other => return Err(McpError::UnsupportedFormat(other.to_string())),
    };

    parse_document(document)
}

fn parse_document(document: Value) -> Result<BTreeMap<String, McpServerConfig>> {
    let servers = match document {
        Value::Object(mut root) => root.remove("servers").ok_or(McpError::MissingServersKey)?,
        _ => return Err(McpError::MissingServersKey),
    };

    let raw: BTreeMap<String, RawServerConfig> = match servers {
        Value::Null => BTreeMap::new(),
        other => serde_json::from_value(other)?,
    };

    raw.into_iter()
        .map(|(id, raw)| {
            validate_server_id(&id)?;
            let config = McpServerConfig::from_raw(&id, raw)?;
            Ok((id, config))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_json_stdio_server() {
        let file = write_file(".json", r#"{"servers":{"echo":{"command":"echo_server"}}}"#);
        let servers = parse_config_file(file.path()).unwrap();

        assert_eq!(servers.len(), 1);
        let config = &servers["echo"];
        assert_eq!(
            config.transport,
            TransportConfig::Stdio(StdioConnectionParams::new("echo_server"))
        );
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn test_parse_yaml_with_overrides() {
        let file = write_file(
            ".yml",
            r#"
servers:
  search:
    transport: sse
    url: http://localhost:8931/sse
    timeout: 2
    max_retries: 5
    retry_delay: 0.5
    tools: [query]
"#,
        );
        let servers = parse_config_file(file.path()).unwrap();
        let config = &servers["search"];

        match &config.transport {
            TransportConfig::Http(params) => {
                assert_eq!(params.url, "http://localhost:8931/sse");
                assert_eq!(params.timeout, Duration::from_secs(2));
                assert_eq!(params.sse_read_timeout, Duration::from_secs(300));
            }
            other => panic!("unexpected transport: {other:?}"),
        }
        assert_eq!(config.max_retries, Some(5));
        assert_eq!(config.retry_delay, Some(Duration::from_millis(500)));
        assert!(config.exposes("query"));
        assert!(!config.exposes("delete"));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_config_file(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, McpError::ConfigNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_file(".toml", "[servers]\n");
        let err = parse_config_file(file.path()).unwrap_err();
        assert!(matches!(err, McpError::UnsupportedFormat(ref ext) if ext == "toml"));
    }

    #[test]
    fn test_missing_servers_key() {
        let file = write_file(".json", r#"{"mcp": {}}"#);
        let err = parse_config_file(file.path()).unwrap_err();
        assert!(matches!(err, McpError::MissingServersKey));
    }

    #[test]
    fn test_empty_servers_map() {
        let servers = parse_document(json!({"servers": null})).unwrap();
        assert!(servers.is_empty());
    }

    #[test]
    fn test_transport_must_be_determinable() {
        let err = parse_document(json!({"servers": {"x": {"args": ["a"]}}})).unwrap_err();
        assert!(matches!(err, McpError::InvalidConfig { ref server, .. } if server == "x"));

        let err = parse_document(json!({
            "servers": {"x": {"command": "a", "url": "http://b"}}
        }))
        .unwrap_err();
        assert!(matches!(err, McpError::InvalidConfig { .. }));

        let err = parse_document(json!({"servers": {"x": {"transport": "stdio", "url": "http://b"}}}))
            .unwrap_err();
        assert!(matches!(err, McpError::InvalidConfig { .. }));
    }

    #[test]
    fn test_server_id_may_not_contain_separator() {
        let err = parse_document(json!({"servers": {"a__b": {"command": "x"}}})).unwrap_err();
        assert!(matches!(err, McpError::InvalidConfig { .. }));
        assert!(validate_server_id("files").is_ok());
        assert!(validate_server_id("").is_err());
    }

    #[test]
    fn test_env_references_are_resolved() {
        unsafe {
            std::env::set_var("ZDK_MCP_CONFIG_TEST_TOKEN", "secret");
        }
        let servers = parse_document(json!({
            "servers": {
                "remote": {
                    "url": "http://localhost/mcp",
                    "headers": {
                        "Authorization": "${ZDK_MCP_CONFIG_TEST_TOKEN}",
                        "X-Unset": "${ZDK_MCP_CONFIG_TEST_SURELY_UNSET}",
                        "X-Plain": "plain"
                    }
                }
            }
        }))
        .unwrap();

        let TransportConfig::Http(params) = &servers["remote"].transport else {
            panic!("expected http transport");
        };
        assert_eq!(params.headers["Authorization"], "secret");
        assert_eq!(params.headers["X-Plain"], "plain");
        assert!(!params.headers.contains_key("X-Unset"));
    }
}

//! Connection parameters for MCP servers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default connect timeout for HTTP transports
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Default read timeout for an open event stream
pub const DEFAULT_SSE_READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Parameters for connecting to an MCP server via stdio subprocess
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdioConnectionParams {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl StdioConnectionParams {
    /// Create new connection parameters with the given command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Add a command-line argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several command-line arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Run the subprocess in this working directory
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

/// Parameters for connecting to an MCP server over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConnectionParams {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Time allowed to establish the HTTP connection
    #[serde(default = "default_http_timeout", with = "secs_f64")]
    pub timeout: Duration,
    /// Time an open event stream may stay silent
    #[serde(default = "default_sse_read_timeout", with = "secs_f64")]
    pub sse_read_timeout: Duration,
}

impl HttpConnectionParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout: DEFAULT_HTTP_TIMEOUT,
            sse_read_timeout: DEFAULT_SSE_READ_TIMEOUT,
        }
    }

    /// Add a request header sent with every request
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sse_read_timeout(mut self, timeout: Duration) -> Self {
        self.sse_read_timeout = timeout;
        self
    }
}

fn default_http_timeout() -> Duration {
    DEFAULT_HTTP_TIMEOUT
}

fn default_sse_read_timeout() -> Duration {
    DEFAULT_SSE_READ_TIMEOUT
}

/// Durations written as fractional seconds
pub(crate) mod secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdio_params_builder() {
        let params = StdioConnectionParams::new("test-command")
            .arg("--flag")
            .args(["a", "b"])
            .env("KEY", "value")
            .cwd("/tmp");

        assert_eq!(params.command, "test-command");
        assert_eq!(params.args, vec!["--flag", "a", "b"]);
        assert_eq!(params.env.len(), 1);
        assert_eq!(params.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_http_params_defaults() {
        let params: HttpConnectionParams =
            serde_json::from_str(r#"{"url": "http://localhost:8080/mcp"}"#).unwrap();

        assert_eq!(params.timeout, Duration::from_secs(5));
        assert_eq!(params.sse_read_timeout, Duration::from_secs(300));
        assert!(params.headers.is_empty());
    }

    #[test]
    fn test_http_params_fractional_timeout() {
        let params: HttpConnectionParams =
            serde_json::from_str(r#"{"url": "http://x", "timeout": 2.5}"#).unwrap();
        assert_eq!(params.timeout, Duration::from_millis(2500));

        let negative = serde_json::from_str::<HttpConnectionParams>(r#"{"url": "http://x", "timeout": -1}"#);
        assert!(negative.is_err());
    }
}

//! Bounded retry policy for connection attempts

use crate::config::McpServerConfig;
use std::time::Duration;
use zdk_core::McpConfig;

/// How often and how patiently to try connecting to a server.
///
/// The delay between attempts is fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts; `0` still makes one attempt
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Upper bound on one attempt (transport, handshake); `None` waits forever
    pub connect_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            connect_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Chest-wide policy from the `[mcp]` config section.
    ///
    /// A `connect_timeout_secs` of 0 disables the per-attempt timeout.
    pub fn from_config(config: &McpConfig) -> Self {
        let retry_delay = Duration::try_from_secs_f64(config.retry_delay_secs).unwrap_or_else(|e| {
            tracing::warn!(
                retry_delay_secs = config.retry_delay_secs,
                error = %e,
                "Invalid retry delay; retrying without delay"
            );
            Duration::ZERO
        });

        Self {
            max_retries: config.max_retries,
            retry_delay,
            connect_timeout: match config.connect_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }

    /// This policy with a server's own overrides applied
    pub fn for_server(&self, config: &McpServerConfig) -> Self {
        Self {
            max_retries: config.max_retries.unwrap_or(self.max_retries),
            retry_delay: config.retry_delay.unwrap_or(self.retry_delay),
            connect_timeout: config.connect_timeout.or(self.connect_timeout),
        }
    }

    /// Number of attempts actually made
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::StdioConnectionParams;

    #[test]
    fn test_zero_retries_still_attempts_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
        assert_eq!(RetryPolicy::new(4, Duration::ZERO).attempts(), 4);
    }

    #[test]
    fn test_from_config() {
        let config = McpConfig {
            config_path: None,
            max_retries: 5,
            retry_delay_secs: 0.25,
            connect_timeout_secs: 0,
        };
        let policy = RetryPolicy::from_config(&config);

        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.retry_delay, Duration::from_millis(250));
        assert_eq!(policy.connect_timeout, None);
    }

    #[test]
    fn test_server_overrides() {
        let base = RetryPolicy::default();
        let server = McpServerConfig::stdio(StdioConnectionParams::new("srv"))
            .max_retries(1)
            .connect_timeout(Duration::from_secs(2));

        let policy = base.for_server(&server);
        assert_eq!(policy.max_retries, 1);
        assert_eq!(policy.retry_delay, Duration::from_secs(1));
        assert_eq!(policy.connect_timeout, Some(Duration::from_secs(2)));
    }
}

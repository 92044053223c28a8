use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested operation is not part of the toolset's operation table.
    #[error("Toolset '{toolset}' has no operation '{operation}'")]
    UnknownOperation { toolset: String, operation: String },

    /// Dependency lookup on a toolset that no chest owns.
    #[error("Toolset '{0}' is not attached to a tool chest")]
    NoOwner(String),

    #[error("Invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Tool '{tool}' execution failed: {source}")]
    ToolFailed {
        tool: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use zdk_core::Error;
    /// let err = Error::config_error("Invalid vendor format");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for creating general errors with a message
    ///
    /// # Example
    /// ```
    /// use zdk_core::Error;
    /// let err = Error::message("Something went wrong");
    /// ```
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Other(anyhow::anyhow!("{}", msg.into()))
    }

    /// Wrap any error as a failure of the named tool.
    pub fn tool_failed(
        tool: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Error::ToolFailed {
            tool: tool.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_operation_message() {
        let err = Error::UnknownOperation {
            toolset: "calculator".to_string(),
            operation: "divide".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Toolset 'calculator' has no operation 'divide'"
        );
    }

    #[test]
    fn test_tool_failed_keeps_source() {
        let err = Error::tool_failed("search", anyhow::anyhow!("timeout"));
        assert!(err.to_string().contains("search"));
        assert!(err.to_string().contains("timeout"));
    }
}

//! Dispatcher error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. Registration
//! errors are returned from `ToolRegistry::register`; invocation errors only
//! ever travel inside a `ToolCallResult`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed cause of a failed tool execution.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dispatcher result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for tool registration and invocation.
#[derive(Error, Debug)]
pub enum Error {
    /// An operation could not be turned into a callable handle.
    #[error("registration error: {0}")]
    Registration(String),

    /// Two declarations share a dispatch key.
    #[error("ambiguous tool: '{0}' is declared more than once")]
    AmbiguousTool(String),

    /// No registered operation matches the name for the requested arity.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Arguments could not be bound to the declared parameters.
    #[error("argument binding error for '{tool}': {message}")]
    ArgumentBinding { tool: String, message: String },

    /// The tool itself failed. The original cause is kept as `source`.
    #[error("execution error in '{tool}': {source}")]
    Execution {
        tool: String,
        #[source]
        source: BoxError,
    },

    /// A tool call that could not be decoded at all.
    #[error("invalid tool call: {0}")]
    InvalidRequest(String),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Cause attached to an `Execution` error when the tool body panicked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("tool panicked: {message}")]
pub struct ToolPanic {
    message: String,
}

impl ToolPanic {
    pub fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Classification of an [`Error`], stable across the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Registration,
    AmbiguousTool,
    ToolNotFound,
    ArgumentBinding,
    Execution,
    InvalidRequest,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Registration(_) => ErrorKind::Registration,
            Error::AmbiguousTool(_) => ErrorKind::AmbiguousTool,
            Error::ToolNotFound(_) => ErrorKind::ToolNotFound,
            Error::ArgumentBinding { .. } => ErrorKind::ArgumentBinding,
            Error::Execution { .. } => ErrorKind::Execution,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Invocation-time errors can be reported back to the model and the
    /// conversation continued. Registration-time errors cannot.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ToolNotFound
                | ErrorKind::ArgumentBinding
                | ErrorKind::Execution
                | ErrorKind::InvalidRequest
        )
    }

    /// Text handed back to the model as the content of a tool-result message.
    pub fn to_tool_message(&self) -> String {
        match self {
            Error::ToolNotFound(name) => {
                format!("Error: tool '{}' is not available", name)
            }
            Error::ArgumentBinding { tool, message } => {
                format!("Error: invalid arguments for tool '{}': {}", tool, message)
            }
            Error::Execution { tool, source } => {
                format!("Error executing tool '{}': {}", tool, source)
            }
            other => format!("Error: {}", other),
        }
    }
}

// Convenience constructors
impl Error {
    pub fn registration(msg: impl Into<String>) -> Self {
        Self::Registration(msg.into())
    }

    pub fn ambiguous_tool(name: impl Into<String>) -> Self {
        Self::AmbiguousTool(name.into())
    }

    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound(name.into())
    }

    pub fn argument_binding(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ArgumentBinding {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn execution(tool: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Execution {
            tool: tool.into(),
            source: source.into(),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kind_and_recoverability() {
        assert_eq!(Error::registration("x").kind(), ErrorKind::Registration);
        assert!(!Error::registration("x").is_recoverable());
        assert!(!Error::ambiguous_tool("add").is_recoverable());
        assert!(Error::tool_not_found("add").is_recoverable());
        assert!(Error::argument_binding("add", "missing b").is_recoverable());
        assert!(Error::execution("add", "boom").is_recoverable());
        assert!(Error::invalid_request("not json").is_recoverable());
    }

    #[test]
    fn test_execution_preserves_source() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = Error::execution("save", cause);

        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "disk on fire");
        assert!(source.downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ArgumentBinding).unwrap();
        assert_eq!(json, "\"argument_binding\"");
    }

    #[test]
    fn test_panic_payloads() {
        let err = std::panic::catch_unwind(|| panic!("index {} out of bounds", 3)).unwrap_err();
        assert_eq!(ToolPanic::from_payload(err).message(), "index 3 out of bounds");

        let err = std::panic::catch_unwind(|| std::panic::panic_any(42_u8)).unwrap_err();
        assert_eq!(ToolPanic::from_payload(err).message(), "non-string panic payload");
    }

    #[test]
    fn test_tool_message() {
        let msg = Error::tool_not_found("missingTool").to_tool_message();
        assert_eq!(msg, "Error: tool 'missingTool' is not available");

        let msg = Error::execution("save", "boom").to_tool_message();
        assert_eq!(msg, "Error executing tool 'save': boom");
    }
}

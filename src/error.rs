//! Error taxonomy for the agent core and constructors used at its seams.
//!
//! Every variant carries the context needed to diagnose it: the store
//! message, the raw model reply, or the name of the missing setting. The
//! core never exits the process; the binary turns these into exit codes.

use thiserror::Error;

/// Failures surfaced by schema introspection, execution and generation.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The store could not be opened.
    #[error("Store unavailable at '{target}': {message}")]
    StoreUnavailable {
        target:  String,
        message: String
    },

    /// Metadata enumeration failed part-way; nothing partial is returned.
    #[error("Failed to read schema: {0}")]
    SchemaReadError(String),

    /// The safety gate rejected the statement before any store access.
    #[error("Refusing to execute: only a single read-only SELECT is allowed: {sql}")]
    UnsafeQueryRejected { sql: String },

    /// The engine rejected the statement at prepare, bind or step time.
    #[error("Query execution failed: {0}")]
    QueryExecutionError(String),

    /// The model reply was not JSON or lacked `choices[0].message.content`.
    #[error("Unexpected LLM response: {body}")]
    UnexpectedModelResponse { body: String },

    /// Transport failure or non-2xx status from the model backend.
    #[error("LLM request failed: {message}")]
    ModelCallFailed {
        message:   String,
        retryable: bool
    },

    /// Unsupported store URL or missing required setting.
    #[error("Configuration error: {0}")]
    ConfigurationError(String)
}

/// Result alias for the agent core
pub type AgentResult<T> = Result<T, AgentError>;

impl AgentError {
    /// Whether a caller-level retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ModelCallFailed {
                retryable: true,
                ..
            }
        )
    }
}

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AgentError {
    AgentError::ConfigurationError(format!("Failed to read file '{}': {}", path, source))
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AgentError {
    AgentError::ConfigurationError(message.into())
}

/// Create store-unavailable error for a target
pub fn store_unavailable(target: &str, source: rusqlite::Error) -> AgentError {
    AgentError::StoreUnavailable {
        target:  target.to_string(),
        message: source.to_string()
    }
}

/// Create HTTP error from a transport failure
pub fn http_error(err: reqwest::Error) -> AgentError {
    let retryable = err.is_timeout() || err.is_connect();
    let message = if err.is_timeout() {
        format!("Request timeout: {}", err)
    } else if err.is_connect() {
        format!("Connection failed: {}", err)
    } else if err.is_status() {
        format!("HTTP error {}: {}", err.status().unwrap_or_default(), err)
    } else {
        err.to_string()
    };
    AgentError::ModelCallFailed {
        message,
        retryable
    }
}

/// Create error for a non-2xx model backend reply
pub fn http_status_error(status: reqwest::StatusCode, body: &str) -> AgentError {
    AgentError::ModelCallFailed {
        message:   format!("LLM API error {}: {}", status, body),
        retryable: status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}

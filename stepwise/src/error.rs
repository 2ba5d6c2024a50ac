//! Unified error types for the stepwise planner.
//!
//! This module provides the error hierarchy for a planning request:
//! - Request-shape violations detected before planning begins
//! - Oracle failures (provider errors, timeouts, unparseable output)
//! - Catalog violations (the oracle chose an action it was not offered)
//! - Normalization failures (a numeric parameter cannot be rendered as a decimal)
//!
//! Every error is terminal for its request: no partial decision is ever
//! returned alongside an error.

use std::fmt;
use std::time::Duration;

/// Result type alias for stepwise operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the stepwise planner.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed request shape.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The reasoning oracle failed.
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// The oracle returned an action that was not offered to it.
    #[error("Action '{action}' is not in the offered catalog [{}]", .offered.join(", "))]
    CatalogViolation {
        /// The action name returned by the oracle (after alias reversal).
        action: String,
        /// Canonical names of every action in the offered catalog.
        offered: Vec<String>,
    },

    /// A numeric parameter leaf could not be rendered as a plain decimal.
    #[error("Cannot normalize parameter '{path}': {reason}")]
    Normalization {
        /// JSON-pointer-like path of the offending leaf.
        path: String,
        /// Why the value could not be rendered.
        reason: String,
    },

    /// Inputs assembled for a contract do not match its declared fields.
    #[error("Contract error: {0}")]
    Contract(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a catalog violation error.
    #[must_use]
    pub fn catalog_violation(action: impl Into<String>, offered: Vec<String>) -> Self {
        Self::CatalogViolation {
            action: action.into(),
            offered,
        }
    }

    /// Create a normalization error.
    #[must_use]
    pub fn normalization(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Normalization {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a contract error.
    #[must_use]
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    /// Whether the error was caused by the caller's request rather than by
    /// the planner or its oracle.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

/// Error type for reasoning oracle invocations.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum OracleError {
    /// The underlying model provider failed.
    #[error("{0}")]
    Model(#[from] LlmError),

    /// The oracle did not answer within the configured bound.
    #[error("no answer within {timeout:?}")]
    Timeout {
        /// The bound that expired.
        timeout: Duration,
    },

    /// A declared output field is missing or has the wrong shape.
    #[error("output field '{field}' is malformed: {reason}")]
    MalformedOutput {
        /// The contract output field.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The oracle answer could not be decoded at all.
    #[error("unparseable output: {0}")]
    Unparseable(String),
}

impl OracleError {
    /// Create a malformed output error.
    #[must_use]
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an unparseable output error.
    #[must_use]
    pub fn unparseable(msg: impl Into<String>) -> Self {
        Self::Unparseable(msg.into())
    }
}

/// Error type for LLM provider operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct LlmError {
    /// The error kind.
    pub kind: LlmErrorKind,
    /// The provider name (e.g., "openai").
    pub provider: Option<String>,
    /// Additional error message.
    pub message: String,
    /// Optional error code from the provider.
    pub code: Option<String>,
}

/// Categories of LLM errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LlmErrorKind {
    /// Authentication or authorization failure.
    Auth,
    /// Response format error.
    ResponseFormat,
    /// Network or connection error.
    Network,
    /// HTTP status error.
    HttpStatus,
    /// Internal error.
    Internal,
}

impl LlmError {
    /// Create an authentication error.
    #[must_use]
    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::Auth,
            provider: Some(provider.into()),
            message: message.into(),
            code: None,
        }
    }

    /// Create a response format error.
    #[must_use]
    pub fn response_format(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::ResponseFormat,
            provider: None,
            message: format!("Expected {}, got {}", expected.into(), got.into()),
            code: None,
        }
    }

    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::Network,
            provider: None,
            message: message.into(),
            code: None,
        }
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::HttpStatus,
            provider: None,
            message: format!("HTTP {status}: {}", body.into()),
            code: Some(status.to_string()),
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::Internal,
            provider: None,
            message: message.into(),
            code: None,
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{provider}] ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code: {code})")?;
        }
        Ok(())
    }
}

impl std::error::Error for LlmError {}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {err}"))
        } else {
            Self::network(err.to_string())
        }
    }
}

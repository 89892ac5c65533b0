// src/error.rs

//! Unified error handling for the lookup engine.
//!
//! Every failure inside the crate is an [`AppError`]. At the service
//! boundary each error is classified into an [`ErrorKind`] and rendered as
//! an [`ErrorEnvelope`], so nothing leaves the core unstructured.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for lookup operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Non-success HTTP status from an upstream endpoint
    #[error("{context} returned HTTP {status}")]
    HttpStatus { context: String, status: u16 },

    /// The caller supplied input the chosen strategy cannot use
    #[error("{message}")]
    Input {
        message: String,
        hint: Option<String>,
    },

    /// Address or postcode not recognized by the data source
    #[error("Not found: {0}")]
    NotFound(String),

    /// External fetch failed
    #[error("{context}: {message}")]
    Adapter { context: String, message: String },

    /// External fetch exceeded its time bound
    #[error("{context} timed out after {secs}s")]
    Timeout { context: String, secs: u64 },

    /// Privileged address directory rejected the credential
    #[error("Address directory rejected the API key: {0}")]
    UpstreamAuth(String),

    /// Adapter output was not structured data
    #[error("Could not parse adapter output: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create an input error with an optional remediation hint.
    pub fn input(message: impl Into<String>, hint: Option<&str>) -> Self {
        Self::Input {
            message: message.into(),
            hint: hint.map(str::to_string),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an adapter error with context.
    pub fn adapter(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Adapter {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a status error for the named request step.
    pub fn status(context: impl Into<String>, status: reqwest::StatusCode) -> Self {
        Self::HttpStatus {
            context: context.into(),
            status: status.as_u16(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl fmt::Display) -> Self {
        Self::Parse(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Classify this error into the public taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input { .. } | Self::Url(_) => ErrorKind::InputError,
            Self::NotFound(_) => ErrorKind::NotFoundError,
            Self::UpstreamAuth(_) => ErrorKind::UpstreamAuthError,
            Self::Parse(_) | Self::Json(_) => ErrorKind::ParseError,
            Self::Io(_)
            | Self::Http(_)
            | Self::HttpStatus { .. }
            | Self::Adapter { .. }
            | Self::Timeout { .. }
            | Self::Toml(_)
            | Self::Config(_)
            | Self::Validation(_) => ErrorKind::AdapterExecutionError,
        }
    }

    /// HTTP-style status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Timeout { .. } => 504,
            Self::Toml(_) | Self::Config(_) | Self::Validation(_) => 500,
            _ => self.kind().status(),
        }
    }

    /// Remediation hint, if one applies.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Input { hint, .. } => hint.as_deref(),
            Self::UpstreamAuth(_) => Some("Check the address directory API key."),
            Self::NotFound(_) => Some("Try adding your house number, e.g. '10 SN8 1RA'."),
            _ => None,
        }
    }
}

/// Public error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InputError,
    NotFoundError,
    AdapterExecutionError,
    UpstreamAuthError,
    ParseError,
}

impl ErrorKind {
    /// Default HTTP-style status for the kind.
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::InputError => 400,
            ErrorKind::UpstreamAuthError => 401,
            ErrorKind::NotFoundError => 404,
            ErrorKind::AdapterExecutionError | ErrorKind::ParseError => 502,
        }
    }
}

/// Canonical error body returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Human-readable message
    pub error: String,

    /// Taxonomy kind
    pub kind: ErrorKind,

    /// Remediation hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    /// Status code, carried out-of-band by the transport
    #[serde(skip)]
    pub status: u16,
}

impl From<&AppError> for ErrorEnvelope {
    fn from(err: &AppError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind(),
            hint: err.hint().map(str::to_string),
            status: err.status_code(),
        }
    }
}

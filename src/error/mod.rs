//! Error handling for recall.
//!
//! This module provides:
//! - [`RecallError`]: The main error enum for all recall operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestion and context
//!
//! Only argument errors are surfaced by the search pipeline itself. Strategy
//! and fallback failures are absorbed into result diagnostics, which keep the
//! variant's message and its code.

mod codes;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;

/// Main error type for recall operations.
#[derive(Error, Debug)]
pub enum RecallError {
    #[error("Invalid argument: query must not be empty")]
    EmptyQuery,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Strategy {strategy} failed: {message}")]
    StrategyFailure { strategy: String, message: String },

    #[error("Strategy {strategy} timed out after {timeout_ms}ms")]
    StrategyTimeout { strategy: String, timeout_ms: u64 },

    #[error("Fallback {stage} failed: {message}")]
    FallbackFailure { stage: String, message: String },

    #[error("Query parse error: {0}")]
    QueryParse(String),

    #[error("Search index error: {0}")]
    SearchIndex(#[from] tantivy::TantivyError),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RecallError {
    /// Get the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyQuery => ErrorCode::QueryEmpty,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::UnknownLayer(_) => ErrorCode::UnknownLayer,
            Self::UnknownStrategy(_) => ErrorCode::UnknownStrategy,
            Self::StrategyFailure { .. } => ErrorCode::StrategyFailed,
            Self::StrategyTimeout { .. } => ErrorCode::SearchTimeout,
            Self::FallbackFailure { .. } => ErrorCode::FallbackFailed,
            Self::QueryParse(_) => ErrorCode::SearchQueryInvalid,
            Self::SearchIndex(_) => ErrorCode::IndexError,
            Self::Git(err) if err.code() == git2::ErrorCode::NotFound => {
                ErrorCode::GitNotRepository
            }
            Self::Git(_) => ErrorCode::GitError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) | Self::Yaml(_) => ErrorCode::SerializationError,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
            Self::Cancelled(_) => ErrorCode::Cancelled,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the search pipeline surfaces this error to its caller.
    #[must_use]
    pub const fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyQuery
                | Self::InvalidArgument(_)
                | Self::UnknownLayer(_)
                | Self::UnknownStrategy(_)
        )
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::UnknownLayer(layer) => Some(serde_json::json!({ "layer": layer })),
            Self::UnknownStrategy(strategy) => Some(serde_json::json!({ "strategy": strategy })),
            Self::StrategyFailure { strategy, message } => {
                Some(serde_json::json!({ "strategy": strategy, "message": message }))
            }
            Self::StrategyTimeout {
                strategy,
                timeout_ms,
            } => Some(serde_json::json!({ "strategy": strategy, "timeout_ms": timeout_ms })),
            Self::FallbackFailure { stage, message } => {
                Some(serde_json::json!({ "stage": stage, "message": message }))
            }
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_recall_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
///
/// Emitted in machine output and as the `data` member of MCP error replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "QUERY_EMPTY")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 101)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "argument", "config", "search")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from a `RecallError`.
    #[must_use]
    pub fn from_recall_error(err: &RecallError) -> Self {
        let code = err.code();
        Self {
            code,
            numeric_code: code.numeric(),
            message: err.to_string(),
            suggestion: code.suggestion().to_string(),
            context: err.context(),
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
        }
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Set a custom suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<RecallError> for StructuredError {
    fn from(err: RecallError) -> Self {
        Self::from_recall_error(&err)
    }
}

impl From<&RecallError> for StructuredError {
    fn from(err: &RecallError) -> Self {
        Self::from_recall_error(err)
    }
}

/// Result type alias using `RecallError`.
pub type Result<T> = std::result::Result<T, RecallError>;

//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Argument errors
//! - 3xx: Config errors
//! - 4xx: Search errors
//! - 6xx: Index/storage errors
//! - 7xx: Git errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for machine output and MCP error payloads.
///
/// Each variant maps to a numeric code (e.g., `QueryEmpty` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Argument errors (1xx)
    // ========================================
    /// E101: Query is empty or whitespace only
    QueryEmpty,
    /// E102: Argument has an invalid value
    InvalidArgument,
    /// E103: Unknown memory layer name
    UnknownLayer,
    /// E104: Unknown strategy name
    UnknownStrategy,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E301: Config file not found
    ConfigNotFound,
    /// E302: Config file has invalid syntax or values
    ConfigInvalid,
    /// E304: Required config value is missing
    ConfigMissingRequired,

    // ========================================
    // Search errors (4xx)
    // ========================================
    /// E401: Query could not be parsed by a back-end
    SearchQueryInvalid,
    /// E402: A strategy exceeded its timeout
    SearchTimeout,
    /// E403: A retrieval strategy failed
    StrategyFailed,
    /// E404: A fallback stage failed
    FallbackFailed,

    // ========================================
    // Index/storage errors (6xx)
    // ========================================
    /// E601: Failed to read a source file
    StorageReadError,
    /// E602: Index operation failed
    IndexError,
    /// E605: Serialization/deserialization failed
    SerializationError,

    // ========================================
    // Git errors (7xx)
    // ========================================
    /// E701: Directory is not a git repository
    GitNotRepository,
    /// E704: General git error
    GitError,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E901: Unexpected internal error
    InternalError,
    /// E903: Operation timed out
    Timeout,
    /// E904: Operation was cancelled
    Cancelled,
    /// E905: Generic not found (catch-all)
    NotFound,
    /// E906: IO operation failed
    IoError,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `QueryEmpty` -> 101).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::QueryEmpty => 101,
            Self::InvalidArgument => 102,
            Self::UnknownLayer => 103,
            Self::UnknownStrategy => 104,

            Self::ConfigNotFound => 301,
            Self::ConfigInvalid => 302,
            Self::ConfigMissingRequired => 304,

            Self::SearchQueryInvalid => 401,
            Self::SearchTimeout => 402,
            Self::StrategyFailed => 403,
            Self::FallbackFailed => 404,

            Self::StorageReadError => 601,
            Self::IndexError => 602,
            Self::SerializationError => 605,

            Self::GitNotRepository => 701,
            Self::GitError => 704,

            Self::InternalError => 901,
            Self::Timeout => 903,
            Self::Cancelled => 904,
            Self::NotFound => 905,
            Self::IoError => 906,
        }
    }

    /// Get the error code as a formatted string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::QueryEmpty => "Provide a non-empty query, e.g. `recall search \"auth flow\"`",
            Self::InvalidArgument => "Check the argument values. Run `recall search --help` for accepted ranges",
            Self::UnknownLayer => "Valid layers: rules, transcripts, summaries, team",
            Self::UnknownStrategy => "Valid strategies: direct_fts, expanded_fts, semantic, summaries",

            Self::ConfigNotFound => "Create a config file or specify --config <path>",
            Self::ConfigInvalid => "Run `recall config` to see current values. Check TOML syntax in config file",
            Self::ConfigMissingRequired => "Set the required value in config.toml or via RECALL_* environment variables",

            Self::SearchQueryInvalid => "Simplify the query; punctuation-only terms are ignored",
            Self::SearchTimeout => "Try a simpler query or increase the per-strategy timeout with --timeout",
            Self::StrategyFailed => "Check the back-end for this layer. Other strategies still contribute results",
            Self::FallbackFailed => "The fallback stage was skipped. Check the sessions directory is readable",

            Self::StorageReadError => "Check file permissions and ensure the source path is accessible",
            Self::IndexError => "The in-memory index could not be built. Check source files for validity",
            Self::SerializationError => "The data format may be corrupted. Check input data for validity",

            Self::GitNotRepository => "Run from inside a git repository, or disable the team layer",
            Self::GitError => "Check git status with `git status`. The repository may be in an unusual state",

            Self::InternalError => "An unexpected error occurred. Please report this issue with full error output",
            Self::Timeout => "Operation timed out. Try again or increase timeout settings",
            Self::Cancelled => "The operation was cancelled before it completed",
            Self::NotFound => "The requested resource was not found. Check the path or identifier",
            Self::IoError => "File operation failed. Check path exists and permissions are correct",
        }
    }

    /// Check if this error is potentially recoverable by the user.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::QueryEmpty
            | Self::InvalidArgument
            | Self::UnknownLayer
            | Self::UnknownStrategy
            | Self::ConfigNotFound
            | Self::ConfigInvalid
            | Self::ConfigMissingRequired
            | Self::SearchQueryInvalid
            | Self::SearchTimeout
            | Self::StrategyFailed
            | Self::FallbackFailed
            | Self::StorageReadError
            | Self::GitNotRepository
            | Self::GitError
            | Self::Timeout
            | Self::Cancelled
            | Self::NotFound
            | Self::IoError => true,

            Self::IndexError | Self::SerializationError | Self::InternalError => false,
        }
    }

    /// Get the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "argument",
            3 => "config",
            4 => "search",
            6 => "storage",
            7 => "git",
            9 => "internal",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::QueryEmpty,
            Self::InvalidArgument,
            Self::UnknownLayer,
            Self::UnknownStrategy,
            Self::ConfigNotFound,
            Self::ConfigInvalid,
            Self::ConfigMissingRequired,
            Self::SearchQueryInvalid,
            Self::SearchTimeout,
            Self::StrategyFailed,
            Self::FallbackFailed,
            Self::StorageReadError,
            Self::IndexError,
            Self::SerializationError,
            Self::GitNotRepository,
            Self::GitError,
            Self::InternalError,
            Self::Timeout,
            Self::Cancelled,
            Self::NotFound,
            Self::IoError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}

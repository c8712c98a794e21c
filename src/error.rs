//! Error types for issuelens operations.
//!
//! This module provides a comprehensive error hierarchy using `thiserror` for
//! all operations including file storage, indexing, analysis, LLM calls, and
//! CLI commands. Every user-visible error carries a one-line remediation hint
//! via [`Error::suggestion`].

use thiserror::Error;

/// Result type alias for issuelens operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for issuelens operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File-store errors (dataset, JSON, spreadsheet I/O).
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Vector-index errors (build, load, query).
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// LLM API errors (auth, quota, transport).
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Analysis errors (keywords, trends, overview).
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Test-case evaluation errors.
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Operation cancelled by an external signal.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

impl Error {
    /// Returns a one-line remediation hint for user-facing output, if one
    /// applies to this error kind.
    #[must_use]
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Store(e) => e.suggestion(),
            Self::Index(e) => Some(e.suggestion()),
            Self::Api(e) => e.suggestion(),
            Self::Cancelled => None,
            Self::Config { .. } => {
                Some("check the environment variables and config files".to_string())
            }
            Self::Analysis(_) | Self::Eval(_) | Self::Command(_) => None,
        }
    }

    /// Returns true for transient API failures the caller may retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_transient())
    }
}

/// File-store errors for dataset, JSON, and spreadsheet operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Required input file or dataset is not present.
    #[error("input not found: {path}")]
    InputMissing {
        /// Path that was not found.
        path: String,
    },

    /// File exists but fails the schema or format check.
    #[error("malformed input: {path}: {reason}")]
    InputMalformed {
        /// Path to the offending file.
        path: String,
        /// First offending field or parse error.
        reason: String,
    },

    /// Failed to read a file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to write a file.
    #[error("failed to write file: {path}: {reason}")]
    WriteFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Spreadsheet could not be opened or read.
    #[error("failed to read sheet: {path}: {reason}")]
    SheetFailed {
        /// Path to the workbook.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Directory creation error.
    #[error("failed to create directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    fn suggestion(&self) -> Option<String> {
        match self {
            Self::InputMissing { .. } => {
                Some("run the ingestion step to produce the dataset first".to_string())
            }
            Self::InputMalformed { .. } => {
                Some("regenerate the file; partial edits are not supported".to_string())
            }
            _ => None,
        }
    }
}

/// Vector-index errors.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Index has not been built yet.
    #[error("vector index not built: {base}")]
    NotBuilt {
        /// Index base path.
        base: String,
    },

    /// A sidecar file is missing or unreadable, or the sidecars disagree.
    #[error("vector index corrupt: {reason}")]
    Corrupt {
        /// What is inconsistent.
        reason: String,
    },

    /// Stored vector dimension does not match the current embedding model.
    #[error("incompatible index: stored dimension {stored}, model dimension {model}")]
    Incompatible {
        /// Dimension recorded in the descriptor.
        stored: usize,
        /// Dimension of the active embedding model.
        model: usize,
    },

    /// Embedding generation failed during build or query.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Index build failed before the atomic swap; prior sidecars are intact.
    #[error("index build failed: {reason}")]
    BuildFailed {
        /// Reason for failure.
        reason: String,
    },
}

impl IndexError {
    fn suggestion(&self) -> String {
        match self {
            Self::NotBuilt { .. } => "run build-index over the dataset first".to_string(),
            Self::Corrupt { .. } | Self::Incompatible { .. } => {
                "rebuild the index with build-index".to_string()
            }
            Self::Embedding(_) | Self::BuildFailed { .. } => {
                "check the embedding model cache and retry".to_string()
            }
        }
    }
}

/// LLM API errors, classified by provider response.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or wrong API key (HTTP 401 or no key configured).
    #[error("{provider} authentication failed: set the {env_var} environment variable")]
    Auth {
        /// Provider name.
        provider: &'static str,
        /// Environment variable holding the key.
        env_var: &'static str,
    },

    /// Insufficient balance (HTTP 402).
    #[error("{provider} quota exhausted: insufficient balance")]
    Quota {
        /// Provider name.
        provider: &'static str,
    },

    /// Request rejected by the provider (HTTP 400/422).
    #[error("{provider} rejected the request: {message}")]
    InvalidArgument {
        /// Provider name.
        provider: &'static str,
        /// Provider message, verbatim.
        message: String,
    },

    /// Rate limited (HTTP 429).
    #[error("{provider} rate limited the request")]
    RateLimited {
        /// Provider name.
        provider: &'static str,
    },

    /// Provider overloaded (HTTP 503/504).
    #[error("{provider} overloaded (HTTP {status})")]
    Overloaded {
        /// Provider name.
        provider: &'static str,
        /// HTTP status code.
        status: u16,
    },

    /// Provider internal error (HTTP 500).
    #[error("{provider} server error")]
    Server {
        /// Provider name.
        provider: &'static str,
    },

    /// No response within the wall-clock budget.
    #[error("{provider} timed out after {seconds}s")]
    Timeout {
        /// Provider name.
        provider: &'static str,
        /// Deadline in seconds.
        seconds: u64,
    },

    /// Any other network or protocol failure.
    #[error("{provider} transport error: {message}")]
    Transport {
        /// Provider name.
        provider: &'static str,
        /// Underlying error description.
        message: String,
    },

    /// Response body did not match the chat-completion schema.
    #[error("{provider} returned an unexpected response: {message}")]
    BadResponse {
        /// Provider name.
        provider: &'static str,
        /// What was missing or malformed.
        message: String,
    },
}

impl ApiError {
    /// Returns true for failures the caller may retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::Overloaded { .. }
                | Self::Server { .. }
                | Self::Timeout { .. }
                | Self::Transport { .. }
        )
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Self::Auth { env_var, .. } => Some(format!("export {env_var}=<your api key>")),
            Self::Quota { provider } => Some(format!("top up the {provider} account balance")),
            Self::RateLimited { .. } => Some("back off and retry after a short delay".to_string()),
            Self::Overloaded { .. } | Self::Server { .. } | Self::Timeout { .. } => {
                Some("transient provider failure; retry the operation".to_string())
            }
            _ => None,
        }
    }
}

/// Analysis errors (keywords, time trends, overview).
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// No records matched the requested filter.
    #[error("no records in range {since}..{until}")]
    EmptyRange {
        /// Inclusive range start.
        since: String,
        /// Inclusive range end.
        until: String,
    },

    /// Unsupported dimension or field selection.
    #[error("invalid parameter: {reason}")]
    InvalidParameter {
        /// Reason the parameter is invalid.
        reason: String,
    },

    /// Chart rendering failed.
    #[error("chart rendering failed: {0}")]
    ChartFailed(String),
}

/// Test-case evaluation errors.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Rubric file is missing a required threshold.
    #[error("rubric incomplete: {field}")]
    RubricIncomplete {
        /// Missing rubric field.
        field: String,
    },

    /// No test cases were loaded from the sheet.
    #[error("no test cases loaded from {path}")]
    NoCases {
        /// Sheet path.
        path: String,
    },

    /// Context window too small for the static prompt template.
    #[error("context window {window} too small: template alone needs {template_tokens} tokens")]
    WindowTooSmall {
        /// Configured context window.
        window: usize,
        /// Measured template tokens.
        template_tokens: usize,
    },
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing required argument.
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),

    /// Output format error.
    #[error("output format error: {0}")]
    OutputFormat(String),
}

// Implement From traits for standard library and dependency errors

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Store(StoreError::Serialization(err.to_string()))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(StoreError::Serialization(err.to_string()))
    }
}

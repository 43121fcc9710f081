//! Error types and error code constants for docgraph.
//!
//! ## Error Code Mapping
//!
//! Exit codes:
//! - `2`: Invalid arguments (bad input from caller, malformed comments)
//! - `3`: Resolution errors (a namespace's `memberOf` cannot be found, missing source file)
//! - `4`: Storage errors (database could not be opened or written)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! ## Design
//!
//! - [`ResolutionError`] is the only error the resolution pass returns. Every other resolution
//!   anomaly is absorbed and shows up as a dropped node or an unresolved reference.
//! - [`GraphError`] adds the registration-time duplicate check.
//! - [`DocError`] is the unified type rendered by the CLI; `impl From<X> for DocError`
//!   bridges the domain errors.

use std::fmt;

use thiserror::Error;

use crate::nodes::NodeKind;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller or malformed input.
    InvalidArguments = 2,
    /// A required parent could not be resolved, or an input file is missing.
    ResolutionError = 3,
    /// The backing store rejected an operation.
    StorageError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Resolution Errors
// ============================================================================

/// A namespace whose `memberOf` is undefined or names nothing in the symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "cannot resolve memberOf '{}' for '{name}'",
    .member_of.as_deref().unwrap_or("<undefined>")
)]
pub struct ResolutionError {
    /// Name of the node being resolved.
    pub name: String,
    /// The `memberOf` string that failed to resolve; `None` when it was never declared.
    pub member_of: Option<String>,
}

impl ResolutionError {
    pub fn new(name: impl Into<String>, member_of: Option<&str>) -> Self {
        ResolutionError {
            name: name.into(),
            member_of: member_of.map(str::to_string),
        }
    }
}

/// Errors raised while registering nodes or building the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Two nodes of different kinds claim the same symbol key.
    #[error("duplicate qualified name '{qualified_name}': registered as {existing}, rejected {incoming}")]
    DuplicateQualifiedName {
        qualified_name: String,
        existing: NodeKind,
        incoming: NodeKind,
    },
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum DocError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// A namespace's parent could not be resolved.
    #[error("{0}")]
    Resolution(ResolutionError),

    /// Two nodes of different kinds share a qualified name.
    #[error("duplicate qualified name '{qualified_name}': registered as {existing}, rejected {incoming}")]
    DuplicateQualifiedName {
        qualified_name: String,
        existing: NodeKind,
        incoming: NodeKind,
    },

    /// A source file could not be turned into tag records.
    #[error("extraction error in {file}: {message}")]
    ExtractionError { file: String, message: String },

    /// The backing store failed.
    #[error("storage error: {message}")]
    StorageError { message: String },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&DocError> for OutputErrorCode {
    fn from(err: &DocError) -> Self {
        match err {
            DocError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            DocError::Resolution(_) => OutputErrorCode::ResolutionError,
            DocError::DuplicateQualifiedName { .. } => OutputErrorCode::InvalidArguments,
            DocError::ExtractionError { .. } => OutputErrorCode::InvalidArguments,
            DocError::StorageError { .. } => OutputErrorCode::StorageError,
            DocError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            DocError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<DocError> for OutputErrorCode {
    fn from(err: DocError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<ResolutionError> for DocError {
    fn from(err: ResolutionError) -> Self {
        DocError::Resolution(err)
    }
}

impl From<GraphError> for DocError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Resolution(err) => DocError::Resolution(err),
            GraphError::DuplicateQualifiedName {
                qualified_name,
                existing,
                incoming,
            } => DocError::DuplicateQualifiedName {
                qualified_name,
                existing,
                incoming,
            },
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl DocError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        DocError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        DocError::FileNotFound { path: path.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        DocError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

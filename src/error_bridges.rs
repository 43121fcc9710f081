//! Error bridge implementations for front-end and storage errors.
//!
//! Conversions into `DocError` live in the root crate because the error types
//! they convert (extraction, sources, storage) are not part of core.

use docgraph_core::error::DocError;

use crate::jsdoc::ExtractError;
use crate::persist::StorageError;
use crate::sources::SourceError;

// ============================================================================
// Bridge: ExtractError -> DocError
// ============================================================================

/// Attach the source file an extraction error came from.
pub(crate) fn extraction_error(file: impl Into<String>, err: ExtractError) -> DocError {
    DocError::ExtractionError {
        file: file.into(),
        message: err.to_string(),
    }
}

// ============================================================================
// Bridge: SourceError -> DocError
// ============================================================================

impl From<SourceError> for DocError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound { path } => DocError::FileNotFound { path },
            SourceError::InvalidPattern { pattern, message } => DocError::InvalidArguments {
                message: format!("invalid include pattern '{}': {}", pattern, message),
                details: Some(serde_json::json!({ "pattern": pattern })),
            },
            SourceError::Io { path, source } => DocError::ExtractionError {
                file: path,
                message: source.to_string(),
            },
        }
    }
}

// ============================================================================
// Bridge: StorageError -> DocError
// ============================================================================

impl From<StorageError> for DocError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::LinkPattern { message } => DocError::InternalError { message },
            other => DocError::StorageError {
                message: other.to_string(),
            },
        }
    }
}

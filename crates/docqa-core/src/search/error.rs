//! Error types for the retrieval store

use thiserror::Error;

/// Coarse error classification used by the boundary layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown session; reported to the caller as a soft error
    NotFound,
    /// Vector/passage alignment or dimension rules were broken
    InvariantViolation,
    /// Persisted artifacts are malformed, mismatched or in an unknown format
    CorruptState,
    /// Device or storage resource could not be acquired
    ResourceExhausted,
    /// Embedding or generation collaborator failed
    Upstream,
    /// The request itself cannot be served (e.g. an empty document)
    InvalidInput,
    /// Configuration could not be loaded or is invalid
    Config,
}

#[derive(Debug, Error)]
pub enum DocQaError {
    #[error("session not found: {session_id}")]
    NotFound { session_id: String },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("corrupt session state for {session_id}: {reason}")]
    CorruptState { session_id: String, reason: String },

    #[error("unsupported {artifact} format version {found} (supported: {supported})")]
    UnsupportedFormat {
        artifact: &'static str,
        found: u32,
        supported: u32,
    },

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("document produced no passages")]
    EmptyDocument,

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("generation error: {0}")]
    Generation(String),

    #[error("API key not configured")]
    ApiKeyMissing,

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type DocQaResult<T> = Result<T, DocQaError>;

impl DocQaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocQaError::NotFound { .. } => ErrorKind::NotFound,
            DocQaError::InvariantViolation(_) | DocQaError::DimensionMismatch { .. } => {
                ErrorKind::InvariantViolation
            }
            DocQaError::CorruptState { .. } | DocQaError::UnsupportedFormat { .. } => {
                ErrorKind::CorruptState
            }
            DocQaError::ResourceExhausted(_) | DocQaError::Io(_) => ErrorKind::ResourceExhausted,
            DocQaError::EmptyDocument => ErrorKind::InvalidInput,
            DocQaError::Embedding(_) | DocQaError::Generation(_) | DocQaError::ApiKeyMissing => {
                ErrorKind::Upstream
            }
            #[cfg(feature = "http")]
            DocQaError::Http(_) => ErrorKind::Upstream,
            DocQaError::Config(_) => ErrorKind::Config,
        }
    }

    /// Only resource acquisition failures are worth retrying after backoff
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ResourceExhausted
    }

    /// Get user-friendly error message for API responses
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::NotFound => "session not found".to_string(),
            ErrorKind::CorruptState => {
                "session data is unreadable, please upload the document again".to_string()
            }
            ErrorKind::ResourceExhausted => "server is busy, please retry shortly".to_string(),
            ErrorKind::InvalidInput => "no text could be extracted from the document".to_string(),
            _ => self.to_string(),
        }
    }

    pub(crate) fn corrupt(session_id: impl Into<String>, reason: impl Into<String>) -> Self {
        DocQaError::CorruptState {
            session_id: session_id.into(),
            reason: reason.into(),
        }
    }
}

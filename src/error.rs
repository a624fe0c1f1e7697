//! Error types for ingestion and retrieval operations.
//!
//! This module provides a comprehensive error hierarchy using `thiserror` for
//! all engine operations including detection, extraction, embedding, storage,
//! and retrieval.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for engine operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Input violates preconditions (bad path, unknown option).
    #[error("validation error: {message}")]
    Validation {
        /// Description of the violated precondition.
        message: String,
    },

    /// Document type/format detection failed catastrophically.
    #[error("detection error: {0}")]
    Detection(#[from] DetectionError),

    /// Format reader failed to extract text.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Embedding provider errors (transient, rate-limited, fatal).
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Persistence failures (chunk store).
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Malformed query or filter.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Configuration errors (unknown keys, invalid values).
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Cooperative cancellation; a terminal state, not a failure.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Creates a validation error from a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a configuration error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error represents cooperative cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Detection-specific errors for format and type classification.
#[derive(Error, Debug)]
pub enum DetectionError {
    /// The file could not be opened or read for sampling.
    #[error("unreadable file: {path}: {reason}")]
    Unreadable {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// The sampled bytes are not valid UTF-8 and no reader accepted them.
    #[error("undecodable content at byte offset {offset}")]
    Undecodable {
        /// Byte offset where decoding failed.
        offset: usize,
    },
}

/// Extraction-specific errors raised by format readers.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file contents.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Memory mapping error.
    #[error("memory mapping failed: {path}: {reason}")]
    MmapFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// No reader registered for the detected format.
    #[error("no reader for format: {format}")]
    UnsupportedFormat {
        /// The detected format name.
        format: String,
    },

    /// Extracted bytes were not valid UTF-8.
    #[error("invalid UTF-8 at byte offset {offset}")]
    InvalidUtf8 {
        /// Byte offset where invalid UTF-8 was found.
        offset: usize,
    },
}

/// Embedding provider errors, classified for retry policy.
///
/// `Transient` and `RateLimited` are retried with exponential backoff;
/// `InvalidInput` is never retried; `Fatal` fails the affected embedding kind.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Timeout or temporary provider failure; retryable.
    #[error("transient provider error: {reason}")]
    Transient {
        /// Reason for the failure.
        reason: String,
    },

    /// Provider rate limit hit; retryable after backoff.
    #[error("provider rate limited: retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested backoff in milliseconds.
        retry_after_ms: u64,
    },

    /// Input rejected by the provider; not retryable.
    #[error("invalid embedding input: {reason}")]
    InvalidInput {
        /// Reason the input was rejected.
        reason: String,
    },

    /// Non-retryable provider failure.
    #[error("fatal provider error: {reason}")]
    Fatal {
        /// Reason for the failure.
        reason: String,
    },

    /// Retries exhausted for a retryable error class.
    #[error("provider retries exhausted after {attempts} attempts: {reason}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last observed failure reason.
        reason: String,
    },

    /// Returned vector failed quality checks (length, finiteness, magnitude).
    #[error("embedding quality check failed: {reason}")]
    QualityCheck {
        /// Which check failed.
        reason: String,
    },
}

impl ProviderError {
    /// Whether this error class is eligible for retry with backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::RateLimited { .. })
    }
}

/// Storage-specific errors for chunk store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// Source not found by ID.
    #[error("source not found: {source_id}")]
    SourceNotFound {
        /// Source ID that was not found.
        source_id: String,
    },

    /// Chunk not found by ID.
    #[error("chunk not found: {chunk_id}")]
    ChunkNotFound {
        /// Chunk ID that was not found.
        chunk_id: String,
    },

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Transaction error; the ingestion aborts and prior versions remain.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A vector's dimensionality does not match the store's frozen `D`.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality the store was initialised with.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },
}

/// Query-specific errors surfaced synchronously to callers.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The query string is empty or whitespace.
    #[error("empty query")]
    EmptyQuery,

    /// An unknown retrieval strategy was requested.
    #[error("unknown strategy: {name}")]
    UnknownStrategy {
        /// Name of the unknown strategy.
        name: String,
    },

    /// A filter referenced an unknown field or invalid value.
    #[error("invalid filter: {reason}")]
    InvalidFilter {
        /// Reason the filter is invalid.
        reason: String,
    },

    /// Requested result count is out of range.
    #[error("invalid k: {k} (must be 1..={max})")]
    InvalidK {
        /// Requested k.
        k: usize,
        /// Maximum allowed k.
        max: usize,
    },
}

// Implement From traits for standard library and dependency errors

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Extraction(ExtractionError::ReadFailed {
            path: String::new(),
            reason: err.to_string(),
        })
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(StoreError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::str::Utf8Error> for ExtractionError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::InvalidUtf8 {
            offset: err.valid_up_to(),
        }
    }
}

impl From<std::string::FromUtf8Error> for ExtractionError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::InvalidUtf8 {
            offset: err.utf8_error().valid_up_to(),
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Self::Validation {
            message: format!("regex error: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::validation("bad file path");
        assert_eq!(err.to_string(), "validation error: bad file path");
    }

    #[test]
    fn test_cancelled_display() {
        let err = Error::Cancelled;
        assert_eq!(err.to_string(), "operation cancelled");
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_detection_error_display() {
        let err = DetectionError::Unreadable {
            path: "/tmp/guide.pdf".to_string(),
            reason: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("/tmp/guide.pdf"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_extraction_error_display() {
        let err = ExtractionError::FileNotFound {
            path: "/tmp/missing.docx".to_string(),
        };
        assert_eq!(err.to_string(), "file not found: /tmp/missing.docx");

        let err = ExtractionError::UnsupportedFormat {
            format: "unknown".to_string(),
        };
        assert!(err.to_string().contains("unknown"));
    }

    #[test]
    fn test_provider_error_retryable() {
        let transient = ProviderError::Transient {
            reason: "timeout".to_string(),
        };
        assert!(transient.is_retryable());

        let rate_limited = ProviderError::RateLimited { retry_after_ms: 500 };
        assert!(rate_limited.is_retryable());

        let invalid = ProviderError::InvalidInput {
            reason: "empty input".to_string(),
        };
        assert!(!invalid.is_retryable());

        let fatal = ProviderError::Fatal {
            reason: "model unloaded".to_string(),
        };
        assert!(!fatal.is_retryable());

        let exhausted = ProviderError::Exhausted {
            attempts: 5,
            reason: "timeout".to_string(),
        };
        assert!(!exhausted.is_retryable());
    }

    #[test]
    fn test_store_error_variants() {
        let err = StoreError::SourceNotFound {
            source_id: "fund-guide".to_string(),
        };
        assert_eq!(err.to_string(), "source not found: fund-guide");

        let err = StoreError::ChunkNotFound {
            chunk_id: "ck_0011aabb".to_string(),
        };
        assert!(err.to_string().contains("ck_0011aabb"));

        let err = StoreError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert!(err.to_string().contains("384"));
        assert!(err.to_string().contains("768"));
    }

    #[test]
    fn test_query_error_variants() {
        let err = QueryError::EmptyQuery;
        assert_eq!(err.to_string(), "empty query");

        let err = QueryError::InvalidK { k: 0, max: 100 };
        assert!(err.to_string().contains('0'));
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn test_error_from_store() {
        let store_err = StoreError::Transaction("rollback".to_string());
        let err: Error = store_err.into();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_error_from_provider() {
        let provider_err = ProviderError::Fatal {
            reason: "dead".to_string(),
        };
        let err: Error = provider_err.into();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: Error = rusqlite_err.into();
        assert!(matches!(err, Error::Store(StoreError::Database(_))));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err: serde_json::Error = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: StoreError = json_err.into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn test_from_utf8_error() {
        let invalid_bytes: Vec<u8> = vec![0xff, 0xfe];
        let utf8_err = String::from_utf8(invalid_bytes).unwrap_err();
        let err: ExtractionError = utf8_err.into();
        assert!(matches!(err, ExtractionError::InvalidUtf8 { .. }));
    }
}

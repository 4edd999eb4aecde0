//! Error types for the rosterload import pipeline and store wrappers.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`CsvError`] - CSV parsing errors
//! - [`StoreError`] - backing-store (hosted data API) errors
//! - [`ImportError`] - top-level import pipeline errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::import::validate::ValidationError;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors during CSV parsing.
///
/// Malformed input is fatal to the current import attempt: the first
/// parser-reported problem is surfaced and no partial import occurs.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the detected encoding.
    #[error("Failed to decode input: {0}")]
    Encoding(String),

    /// Malformed CSV (bad quoting, ragged rows).
    #[error("Invalid CSV format: {0}")]
    Malformed(String),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the backing store (hosted data API).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Missing configuration (URL or API key).
    #[error("Missing store configuration: {0}")]
    MissingConfig(String),

    /// HTTP round-trip failed (connectivity, timeout).
    #[error("Store request failed: {0}")]
    RequestFailed(String),

    /// The store rejected a uniqueness constraint.
    ///
    /// Raw constraint messages are rewritten into this variant so the
    /// dashboard can show "identifier already exists" instead of the
    /// backend's internals.
    #[error("A record with identifier '{0}' already exists")]
    DuplicateIdentifier(String),

    /// The store rejected the write for any other reason.
    #[error("Store rejected the request: {0}")]
    Rejected(String),

    /// Response body could not be understood.
    #[error("Invalid store response: {0}")]
    InvalidResponse(String),

    /// Unknown entity kind in a request path.
    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),
}

impl StoreError {
    /// Classify a raw backend rejection message.
    ///
    /// PostgREST-style backends report unique violations with SQLSTATE
    /// 23505 or a "duplicate key" message; anything else passes through
    /// verbatim.
    pub fn from_rejection(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("23505")
            || lower.contains("duplicate key")
            || lower.contains("unique constraint")
        {
            // The offending value is not always recoverable from the
            // backend message; fall back to the message itself.
            StoreError::DuplicateIdentifier(extract_duplicate_value(&message))
        } else {
            StoreError::Rejected(message)
        }
    }
}

/// Pull the offending key value out of a Postgres detail line like
/// `Key (student_id)=(S-001) already exists.` when present.
fn extract_duplicate_value(message: &str) -> String {
    if let Some(start) = message.find(")=(") {
        let rest = &message[start + 3..];
        if let Some(end) = rest.find(')') {
            return rest[..end].to_string();
        }
    }
    message.to_string()
}

// =============================================================================
// Import Pipeline Errors (top-level)
// =============================================================================

/// Top-level errors from the import pipeline.
///
/// This is the main error type returned by
/// [`crate::import::pipeline::ImportPipeline::run`].
#[derive(Debug, Error)]
pub enum ImportError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// One or more rows failed validation; the whole batch was rejected
    /// before any network call. All detected errors are carried.
    #[error("{} validation error(s)", .0.len())]
    Validation(Vec<ValidationError>),

    /// The backing store rejected the bulk write.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// No data rows to import.
    #[error("No records to import")]
    EmptyInput,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for import pipeline operations.
pub type ImportResult<T> = Result<T, ImportError>;

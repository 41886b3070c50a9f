//! Error types for clipmark.
//!
//! Attribute resolution itself never fails: every degenerate case resolves
//! to "no value". Errors only arise at the edges, when interchange records or
//! configuration are malformed, or when the worker pool cannot accept work.

use thiserror::Error;

/// Validation errors raised while decoding records or configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing or empty")]
    MissingField {
        field: String,
    },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        field: String,
        max_length: usize,
    },

    #[error("Invalid name '{value}' for '{field}'")]
    InvalidName {
        field: String,
        value: String,
    },

    #[error("Pointer into '{origin}' overflows its coordinate space")]
    PointerOverflow {
        origin: String,
    },

    #[error("Duplicate container name: {name}")]
    DuplicateContainer {
        name: String,
    },

    #[error("Duplicate relation name: {name}")]
    DuplicateRelation {
        name: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Errors from the parallel resolution runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Resolution queue is full (capacity {capacity})")]
    QueueFull {
        capacity: usize,
    },

    #[error("Resolution pool is shut down")]
    Disconnected,

    #[error("Unknown container: {name}")]
    UnknownContainer {
        name: String,
    },

    #[error("Resolution timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

/// Top-level error type for clipmark.
#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl MarkupError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a runtime error.
    #[must_use]
    pub const fn is_runtime(&self) -> bool {
        matches!(self, Self::Runtime(_))
    }

    /// Returns true if this is a serialization error.
    #[must_use]
    pub const fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if the same request may succeed later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Runtime(RuntimeError::QueueFull { .. } | RuntimeError::Timeout { .. })
        )
    }
}

/// Result type alias for clipmark operations.
pub type MarkupResult<T> = Result<T, MarkupError>;

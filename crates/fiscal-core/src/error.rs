//! # Error Types
//!
//! Domain-specific error types for fiscal-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fiscal-core errors (this file)                                        │
//! │  ├── CoreError        - Decoding and validation of bill records        │
//! │  └── ValidationError  - Field-level rule failures                      │
//! │                                                                         │
//! │  fiscal-device errors (separate crate)                                 │
//! │  └── DeviceError      - Channel / protocol / payment failures          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DeviceError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised while turning an upstream record into a usable [`Bill`].
///
/// [`Bill`]: crate::types::Bill
#[derive(Debug, Error)]
pub enum CoreError {
    /// The upstream bill record could not be decoded.
    ///
    /// ## When This Occurs
    /// - Malformed JSON
    /// - A required key is missing
    /// - A numeric field holds text
    #[error("Failed to decode bill record: {0}")]
    Decoding(String),

    /// The record decoded but breaks a bill rule.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Decoding(err.to_string())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Bill validation errors.
///
/// Checked before any command reaches the device, so a bad bill never opens
/// a device session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// A bill needs at least one entry in a collection.
    #[error("bill must contain at least one {what}")]
    Empty { what: String },

    /// One half of a both-or-neither pair was supplied.
    #[error("{field} and {partner} must be given together")]
    IncompletePair { field: String, partner: String },

    /// Invalid format (e.g. an unparseable amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

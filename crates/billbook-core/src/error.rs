//! # Error Types
//!
//! Domain-specific error types for billbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  billbook-core errors (this file)                                      │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  billbook-db errors (separate crate)                                   │
//! │  └── DbError          - Storage, numbering and config failures         │
//! │                                                                         │
//! │  NOT errors: a missing tax rate is a PricingWarning, and pricing       │
//! │  itself never fails (it clamps).                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A document type name that has no number sequence.
    #[error("Unknown document kind: '{0}' (expected invoice or quote)")]
    UnknownDocumentKind(String),

    /// A line item failed validation.
    ///
    /// ## When This Occurs
    /// The save workflow validates every line before pricing it for the
    /// final snapshot; `index` is the zero-based row so the form can
    /// highlight it.
    #[error("Line {index} is invalid: {source}")]
    InvalidLine {
        index: usize,
        #[source]
        source: ValidationError,
    },

    /// A document was saved with nothing billable on it.
    #[error("Document has no line items")]
    EmptyDocument,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised by callers before pricing; the pricing engine itself never
/// produces these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. an amount like "1,000.00").
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g. two number formats sharing a prefix).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::UnknownDocumentKind("receipt".to_string());
        assert_eq!(
            err.to_string(),
            "Unknown document kind: 'receipt' (expected invoice or quote)"
        );

        let err = CoreError::InvalidLine {
            index: 2,
            source: ValidationError::MustBePositive {
                field: "quantity".to_string(),
            },
        };
        assert_eq!(err.to_string(), "Line 2 is invalid: quantity must be positive");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "description".to_string(),
        };
        assert_eq!(err.to_string(), "description is required");

        let err = ValidationError::OutOfRange {
            field: "percent discount".to_string(),
            min: 0,
            max: 100,
        };
        assert_eq!(err.to_string(), "percent discount must be between 0 and 100");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

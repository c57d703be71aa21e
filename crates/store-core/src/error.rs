//! # Error Types
//!
//! Domain-specific error types for store-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  store-core errors (this file)                                         │
//! │  ├── CoreError         - General domain errors                         │
//! │  ├── ValidationErrors  - Every failed field of one request             │
//! │  └── ValidationError   - One failed field                              │
//! │                                                                         │
//! │  store-db errors (separate crate)                                      │
//! │  └── DbError           - Database operation failures                   │
//! │                                                                         │
//! │  store-api errors (in app)                                             │
//! │  └── ApiError          - What the HTTP client sees                     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → JSON envelope          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages are user-facing: they name the field by its label, so
//! `Material name is required` rather than `material_name: missing`.

use std::fmt;

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The request payload failed its schema.
    ///
    /// ## When This Occurs
    /// - A required field is absent
    /// - A value has the wrong type, length or range
    /// - An unknown field was sent
    /// - A cross-field rule failed (`Passwords do not match`)
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// A schema name was requested that the registry does not know.
    ///
    /// This is a programming error in the caller, reported as a server fault.
    #[error("Validation schema '{0}' not found")]
    SchemaNotFound(String),

    /// A validated payload did not match the typed input it was decoded into.
    #[error("Validated payload could not be decoded: {0}")]
    Decode(String),

    /// A payment would exceed what is still owed on an order.
    #[error("Payment of {attempted} exceeds outstanding balance of {outstanding}")]
    Overpayment {
        attempted: String,
        outstanding: String,
    },
}

// =============================================================================
// Validation Error
// =============================================================================

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing.
    #[error("{label} is required")]
    Required { label: String },

    /// A string field is present but empty after trimming.
    #[error("{label} cannot be empty")]
    Empty { label: String },

    /// The value has the wrong JSON type (`must be a number`).
    #[error("{label} must be {expected}")]
    WrongType {
        label: String,
        expected: &'static str,
    },

    /// Field value is too short.
    #[error("{label} must be at least {min} characters")]
    TooShort { label: String, min: usize },

    /// Field value is too long.
    #[error("{label} cannot exceed {max} characters")]
    TooLong { label: String, max: usize },

    /// Value must be strictly greater than zero.
    #[error("{label} must be a positive number")]
    MustBePositive { label: String },

    /// Value must not be below zero.
    #[error("{label} cannot be negative")]
    Negative { label: String },

    /// Numeric value is below its floor.
    #[error("{label} must be at least {min}")]
    BelowMinimum { label: String, min: i64 },

    /// Numeric value is above its ceiling.
    #[error("{label} cannot exceed {max}")]
    AboveMaximum { label: String, max: i64 },

    /// Decimal value carries more places than allowed.
    #[error("{label} must have no more than {places} decimal places")]
    TooPrecise { label: String, places: u32 },

    /// Not an email address.
    #[error("{label} must be a valid email address")]
    InvalidEmail { label: String },

    /// Value is not in allowed set.
    #[error("{label} must be one of: {}", .allowed.join(", "))]
    NotAllowed { label: String, allowed: Vec<String> },

    /// A key the schema does not declare.
    #[error("\"{field}\" is not allowed")]
    UnknownField { field: String },

    /// A rule with a message of its own (password strength, confirmations).
    #[error("{0}")]
    Custom(String),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Every failure collected while validating one payload.
///
/// `Display` joins the individual messages with `", "`, which is the exact
/// text returned to HTTP clients.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        ValidationErrors(Vec::new())
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// Individual messages in the order they were found.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        ValidationErrors(vec![error])
    }
}

impl From<ValidationError> for CoreError {
    fn from(error: ValidationError) -> Self {
        CoreError::Validation(error.into())
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

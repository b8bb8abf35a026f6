//! # Error Types
//!
//! Domain-specific error types for pawpos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pawpos-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  pawpos-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  pawpos-engine errors                                                  │
//! │  └── EngineError      - What the API boundary sees (code + message)    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → API response        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant here is an expected business outcome. None of them is
//! retried; the caller gets the message as-is.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Unknown order, cash session, customer, product or appointment.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The entity is in a state that forbids the operation.
    ///
    /// ## When This Occurs
    /// - Paying or cancelling a CANCELLED order
    /// - Closing a CLOSED cash session
    #[error("{entity} {id} is {status}, cannot perform operation")]
    InvalidState {
        entity: String,
        id: String,
        status: String,
    },

    /// The operation would break a uniqueness rule.
    ///
    /// ## When This Occurs
    /// - Opening a cash session while another one is OPEN
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        status: impl std::fmt::Display,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            status: status.to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write happens, so a rejected request leaves no trace.
#[derive(Debug, Error)]
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

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two fields that exclude each other were both given.
    #[error("{first} and {second} cannot both be set")]
    MutuallyExclusive { first: String, second: String },

    /// Payroll deduction requested for a customer without a staff profile.
    #[error("customer {customer_id} has no staff profile; payroll deduction is not allowed")]
    PayrollNotEligible { customer_id: String },

    /// Payroll deduction requested for a walk-in order.
    #[error("payroll deduction requires an order with a customer")]
    PayrollWithoutCustomer,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

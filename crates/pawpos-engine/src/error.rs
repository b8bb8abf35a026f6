//! # Engine Error Type
//!
//! Unified error type for every `PosEngine` operation.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in PawPOS                                 │
//! │                                                                         │
//! │  Validation ─── ValidationError ──► CoreError::Validation ──┐          │
//! │  Business rule ─────────────────► CoreError::{NotFound,     │          │
//! │                                    InvalidState, Conflict}  │          │
//! │  SQLite ─── sqlx::Error ──► DbError ────────────────────────┤          │
//! │  Deadline ──────────────────────► EngineError::Timeout ─────┤          │
//! │                                                              ▼          │
//! │                                                        EngineError     │
//! │                                                              │          │
//! │                                             code() + to_body()         │
//! │                                                              ▼          │
//! │  {"code": "INVALID_STATE", "message": "Order ... is CANCELLED, ..."}   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `DbError::NotFound` is folded into `CoreError::NotFound` so callers see a
//! single not-found shape regardless of which layer noticed it. Internal
//! failures are logged with full detail and surface with a generic message.

use serde::Serialize;
use thiserror::Error;
use tracing::error;

use pawpos_core::{CoreError, ValidationError};
use pawpos_db::DbError;

/// Errors returned by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failed.
    #[error(transparent)]
    Db(DbError),

    /// The unit of work exceeded its deadline and was rolled back.
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// Anything else that should never happen.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Entity state forbids the operation (409)
    InvalidState,

    /// Uniqueness rule violated (409)
    Conflict,

    /// Input validation failed (400)
    ValidationError,

    /// Internal server error (500)
    Internal,
}

/// What the API controller serializes for a failed call.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Order not found: 5b0c..." }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl EngineError {
    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::Internal(message.into())
    }

    /// Machine-readable category.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Core(CoreError::NotFound { .. }) => ErrorCode::NotFound,
            EngineError::Core(CoreError::InvalidState { .. }) => ErrorCode::InvalidState,
            EngineError::Core(CoreError::Conflict(_)) => ErrorCode::Conflict,
            EngineError::Core(CoreError::Validation(_)) => ErrorCode::ValidationError,
            EngineError::Db(DbError::UniqueViolation { .. }) => ErrorCode::Conflict,
            EngineError::Db(DbError::ForeignKeyViolation { .. }) => ErrorCode::ValidationError,
            EngineError::Db(_) | EngineError::Timeout { .. } | EngineError::Internal(_) => {
                ErrorCode::Internal
            }
        }
    }

    /// Whether this is a business rejection rather than a failure.
    pub fn is_business(&self) -> bool {
        matches!(self, EngineError::Core(_))
    }

    /// Serializable `{code, message}` for the API layer.
    pub fn to_body(&self) -> ErrorBody {
        let code = self.code();
        let message = match (code, self) {
            (_, EngineError::Db(DbError::ForeignKeyViolation { message })) => {
                error!("Foreign key violation: {}", message);
                "Invalid reference".to_string()
            }
            (ErrorCode::Internal, err) => {
                error!("Internal failure: {}", err);
                "Internal error".to_string()
            }
            (_, err) => err.to_string(),
        };

        ErrorBody { code, message }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::Core(CoreError::NotFound { entity, id }),
            other => EngineError::Db(other),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::from(DbError::from(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

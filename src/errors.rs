use sea_orm::error::DbErr;
use thiserror::Error;

/// Error taxonomy for the order lifecycle and reporting core.
///
/// `DatabaseError` covers transient store failures; request-driven callers
/// surface it as a server-side failure, the sweeper logs it and moves on.
/// Cache failures never reach this type: the cache layer swallows them and
/// callers fall back to recomputing from the store.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Event error: {0}")]
    EventError(String),
}

impl ServiceError {
    /// True for errors the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::NotFound(_) | ServiceError::ValidationError(_) | ServiceError::Conflict(_)
        )
    }
}

//! Error taxonomy for core operations.
//!
//! Every variant maps 1:1 to a client-visible outcome. Nothing here is
//! retried automatically; the caller decides.

use crate::backend::BackendError;

/// Errors returned by timeline, ledger, and roster operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Malformed or missing input. The user can correct it and retry.
    #[error("{0}")]
    Validation(String),

    /// The proof-of-humanity token did not verify.
    #[error("verification failed")]
    Verification,

    /// The resource is absent or the feature is gated off.
    #[error("{0}")]
    NotFound(String),

    /// The caller lacks the required permission.
    #[error("forbidden")]
    Forbidden,

    /// A uniqueness constraint rejected the write (e.g. a second vote).
    #[error("{0}")]
    Conflict(String),

    /// A backend fetch, query, or transport failure.
    #[error("{0}")]
    Backend(String),
}

impl From<BackendError> for CoreError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Query(msg) => Self::Backend(msg),
            BackendError::ConstraintViolation(msg) => Self::Conflict(msg),
            BackendError::InvalidReference(msg) => Self::Validation(msg),
            BackendError::NotFound(msg) => Self::NotFound(msg),
        }
    }
}

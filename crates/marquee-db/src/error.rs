//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] errors. [`DbError`] converts into the core's
//! [`BackendError`] so constraint violations keep their meaning across the
//! seam.

use marquee_core::backend::BackendError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A JSON column did not match the expected shape.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A lookup expected at most one row but matched several.
    #[error("{0}")]
    Ambiguous(String),

    /// An update matched no row.
    #[error("{0}")]
    NotFound(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for BackendError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Postgres(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Self::ConstraintViolation(db.message().to_owned())
            }
            DbError::Postgres(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Self::InvalidReference(db.message().to_owned())
            }
            DbError::NotFound(msg) => Self::NotFound(msg),
            other => Self::Query(other.to_string()),
        }
    }
}

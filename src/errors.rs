use sea_orm::error::{DbErr, SqlErr};
use thiserror::Error;

/// Error taxonomy for the document workflow engine.
///
/// Validation and not-found failures are detected before (or at the start of)
/// a transaction; conflicts are always checked inside the transaction that
/// would be invalidated by a concurrent writer. Nothing here retries; the
/// caller decides whether a `Conflict` is worth another attempt.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Wraps a database error without reclassification.
    pub fn db_error(error: DbErr) -> Self {
        ServiceError::DatabaseError(error)
    }

    /// Reclassifies a unique-constraint violation as a `Conflict`.
    ///
    /// The uniqueness constraint is the source of truth for races the
    /// precondition checks cannot see (e.g. two concurrent conversions of the
    /// same quote); any other database failure stays opaque.
    pub fn conflict_on_unique(error: DbErr, message: impl Into<String>) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(message.into()),
            _ => ServiceError::DatabaseError(error),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_helpers_match_variant() {
        let err = ServiceError::Conflict("duplicate share".into());
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }

    #[test]
    fn non_unique_db_error_stays_opaque() {
        let err = ServiceError::conflict_on_unique(
            DbErr::Custom("connection reset".into()),
            "already converted",
        );
        assert!(matches!(err, ServiceError::DatabaseError(_)));
    }

    #[test]
    fn validation_errors_convert() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("lines", validator::ValidationError::new("length"));
        let err: ServiceError = errors.into();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}

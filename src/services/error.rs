use thiserror::Error;

use crate::database::manager::DatabaseError;
use crate::storage::error::StorageError;

/// Outcome taxonomy shared by every core operation.
///
/// `Validation`, `NotFound`, `Conflict`, `Unauthorized` and `Forbidden` are
/// caller problems and carry a human-readable message. `Database`, `Storage`
/// and `Credential` are fatal and propagate the underlying failure untouched.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Database(DatabaseError),

    #[error(transparent)]
    Storage(StorageError),

    #[error("Credential error: {0}")]
    Credential(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ServiceError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

// SQLSTATE classes that are the caller's fault rather than a storage failure
const UNIQUE_VIOLATION: &str = "23505";
const NOT_NULL_VIOLATION: &str = "23502";
const BAD_LITERAL_CODES: &[&str] = &["22P02", "22007", "22008", "22003", "22001"];

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        if let DatabaseError::Sqlx(sqlx::Error::Database(db_err)) = &err {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            if code == UNIQUE_VIOLATION {
                let detail = db_err
                    .constraint()
                    .map(|c| format!("record violates unique constraint {}", c))
                    .unwrap_or_else(|| "record already exists".to_string());
                return ServiceError::Conflict(detail);
            }
            if code == NOT_NULL_VIOLATION {
                return ServiceError::Validation(format!("missing required field: {}", db_err.message()));
            }
            if BAD_LITERAL_CODES.contains(&code.as_str()) {
                return ServiceError::Validation(format!("invalid field value: {}", db_err.message()));
            }
        }
        ServiceError::Database(err)
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::Sqlx(err).into()
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => ServiceError::NotFound(format!("file {} not found", path)),
            StorageError::InvalidPath(msg)
            | StorageError::UnsupportedPreview(msg)
            | StorageError::TooLarge(msg) => ServiceError::Validation(msg),
            other => ServiceError::Storage(other),
        }
    }
}

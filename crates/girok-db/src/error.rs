//! Database error types and utilities

use thiserror::Error;

/// Database operation result type
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Database-specific error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Whether the error is a serialization-isolation conflict that the
    /// caller may retry
    pub fn is_serialization_conflict(&self) -> bool {
        match self {
            DbError::Query(msg) | DbError::Transaction(msg) => {
                // Postgres SQLSTATE 40001 serialization_failure
                msg.contains("40001") || msg.contains("could not serialize")
            }
            _ => false,
        }
    }
}

impl From<sea_orm::DbErr> for DbError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::ConnectionAcquire(_) => {
                DbError::Connection("Failed to acquire database connection".to_string())
            }
            sea_orm::DbErr::RecordNotFound(msg) => DbError::NotFound(msg),
            sea_orm::DbErr::Query(query_err) => DbError::Query(query_err.to_string()),
            sea_orm::DbErr::Exec(exec_err) => DbError::Query(exec_err.to_string()),
            sea_orm::DbErr::Conn(conn_err) => DbError::Connection(conn_err.to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

impl From<girok_core::CoreError> for DbError {
    fn from(err: girok_core::CoreError) -> Self {
        match err {
            girok_core::CoreError::NotFound { entity_type, id } => {
                DbError::NotFound(format!("{entity_type} with id {id}"))
            }
            girok_core::CoreError::Serialization(msg) => DbError::Serialization(msg),
            other => DbError::Internal(other.to_string()),
        }
    }
}

/// Extension trait for converting database results
pub trait DbResultExt<T> {
    /// Convert a not-found error to None
    fn optional(self) -> DbResult<Option<T>>;
}

impl<T> DbResultExt<T> for DbResult<T> {
    fn optional(self) -> DbResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(DbError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_conversion() {
        let core_error = girok_core::CoreError::not_found("Sanction", "abc");
        let db_error: DbError = core_error.into();

        match db_error {
            DbError::NotFound(msg) => assert!(msg.contains("Sanction")),
            _ => panic!("Expected NotFound"),
        }
    }

    #[test]
    fn test_result_extension_optional() {
        let not_found: DbResult<String> = Err(DbError::NotFound("test".to_string()));
        let result = not_found.optional();

        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_serialization_conflict_detection() {
        let conflict = DbError::Query("SQLSTATE 40001: could not serialize access".to_string());
        assert!(conflict.is_serialization_conflict());

        let other = DbError::Query("syntax error".to_string());
        assert!(!other.is_serialization_conflict());
    }
}

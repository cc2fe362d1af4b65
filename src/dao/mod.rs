pub mod connection;
pub mod elections;
pub mod schema;

use sqlx::error::ErrorKind;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Handles database errors and maps them to application errors.
 *
 * # Arguments
 * `error`: The database error to handle.
 * `operation`: Description of the failed operation, used in the message.
 *
 * # Returns
 * An `ApplicationError` corresponding to the database error.
 */
pub fn handle_database_error(error: &sqlx::Error, operation: &str) -> ApplicationError {
    let Some(db_error) = error.as_database_error() else {
        tracing::error!("Failed to {}: {}", operation, error);
        return ApplicationError::new(ErrorType::DatabaseError, format!("Failed to {operation}: {error}"));
    };
    tracing::debug!("Database error: {}, code {:?}", db_error, db_error.code());
    match db_error.kind() {
        ErrorKind::ForeignKeyViolation => ApplicationError::new(ErrorType::ReferentialIntegrity, format!("Failed to {operation}: missing county: {db_error}")),
        ErrorKind::UniqueViolation => ApplicationError::new(ErrorType::ConstraintViolation, format!("Failed to {operation}: already exists: {db_error}")),
        ErrorKind::CheckViolation | ErrorKind::NotNullViolation => ApplicationError::new(ErrorType::ConstraintViolation, format!("Failed to {operation}: {db_error}")),
        _ => {
            tracing::error!("Unhandled database error: {}", db_error);
            ApplicationError::new(ErrorType::DatabaseError, format!("Failed to {operation}: {db_error}"))
        }
    }
}

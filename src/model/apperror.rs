use std::fmt;

/**
 * Represents the type of error that can occur within the application.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    /**
     * Logging or connection setup failed.
     */
    Initialization,
    /**
     * The configuration file could not be read or parsed.
     */
    Configuration,
    /**
     * A source file could not be opened or read.
     */
    Io,
    /**
     * A source row is too short or holds a non-numeric value where a number is required.
     */
    MalformedRow,
    /**
     * A row references a county that does not exist.
     */
    ReferentialIntegrity,
    /**
     * A unique or check constraint was violated.
     */
    ConstraintViolation,
    DatabaseError,
}

/**
 * Represents an error that occurs within the application.
 */
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /**
     * Error type.
     */
    pub error_type: ErrorType,
    /**
     * Error message describing problem.
     */
    pub message: String,
}

impl ApplicationError {
    /**
     * Creates a new ApplicationError.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A description of the error.
     */
    pub fn new(error_type: ErrorType, message: String) -> Self {
        ApplicationError { error_type, message }
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.error_type, self.message)
    }
}

impl std::error::Error for ApplicationError {}

impl From<csv::Error> for ApplicationError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            return ApplicationError::new(ErrorType::Io, format!("Failed to read source: {err}"));
        }
        let line = err.position().map_or(0, csv::Position::line);
        ApplicationError::new(ErrorType::MalformedRow, format!("Unreadable record at line {line}: {err}"))
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// A UNIQUE constraint rejected the write. `constraint` names the
    /// violated column as `table.column`, so callers can distinguish a
    /// short-code collision from any other duplicate key.
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// Raised by a transaction closure to abort with a rollback. The
    /// store treats this as a requested rollback, not a storage failure;
    /// the caller is expected to carry its own reason out of the closure.
    #[error("transaction rolled back")]
    Rollback,
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("database query error: {0}")]
    Query(String),

    #[error("database not found: {0}")]
    NotFound(String),

    #[error("blocking database task failed: {0}")]
    Task(String),
}

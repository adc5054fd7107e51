use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphBenchError {
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("schema error: {0}")]
    SchemaError(String),
    #[error("query error: {0}")]
    QueryError(String),
    #[error("entity not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("history error: {0}")]
    HistoryError(String),
    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl GraphBenchError {
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        GraphBenchError::ConnectionError(msg.into())
    }

    pub fn schema<T: Into<String>>(msg: T) -> Self {
        GraphBenchError::SchemaError(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        GraphBenchError::QueryError(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        GraphBenchError::NotFound(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        GraphBenchError::InvalidInput(msg.into())
    }

    pub fn history<T: Into<String>>(msg: T) -> Self {
        GraphBenchError::HistoryError(msg.into())
    }

    pub fn task_failed<T: Into<String>>(msg: T) -> Self {
        GraphBenchError::TaskFailed(msg.into())
    }
}

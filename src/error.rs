use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing table: {0}")]
    MissingTable(String),
    #[error("failed to read table {table}: {message}")]
    Source { table: String, message: String },
    #[error("Invalid action: {0}")]
    UnknownAction(String),
}

impl PipelineError {
    pub fn read_failure(table: &str, err: impl std::fmt::Display) -> Self {
        Self::Source {
            table: table.to_string(),
            message: err.to_string(),
        }
    }
}

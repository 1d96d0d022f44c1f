use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config database error during {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    #[error("config serialization error: {0}")]
    Serialization(String),

    #[error("no config record has been saved yet")]
    NotInitialized,
}

impl ConfigError {
    pub fn database(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Database {
            operation,
            message: err.to_string(),
        }
    }
}

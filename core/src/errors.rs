use thiserror::Error;

/// MedQuery client errors
#[derive(Error, Debug)]
pub enum MedQueryError {
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("Storage Error: {0}")]
    StorageError(String),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    OtherError(String),
}

impl MedQueryError {
    /// Human readable description shown inside the chat, `unknown error` when empty.
    pub fn describe(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            "unknown error".to_string()
        } else {
            text
        }
    }
}

/// Result type for MedQuery operations
pub type MedQueryResult<T> = Result<T, MedQueryError>;

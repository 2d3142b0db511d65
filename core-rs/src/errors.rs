//! Error types for the lookup core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Invalid lookup query: {0}")]
    InvalidQuery(String),

    #[error("Lookup processing error: {0}")]
    Processing(String),

    #[error("Failed to fetch entity types: {0}")]
    TypeFetch(String),

    #[error("Lookup service not found: {0}")]
    ServiceNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LookupError {
    /// True when the caller supplied a request that can never succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LookupError::InvalidQuery(_) | LookupError::ServiceNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;

//! Application error types.

use thiserror::Error;

/// Application-level errors for content migrations.
#[derive(Error, Debug)]
pub enum AppError {
    // Store errors
    #[error("Store query error: {message}")]
    Query { message: String, collection: String },

    #[error("Store connection error: {0}")]
    Connection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Corpus errors
    #[error("Corpus serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Document is not a JSON object: {0}")]
    NotAnObject(String),

    // Domain errors
    #[error("Invalid identifier pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid run options: {0}")]
    InvalidOptions(String),

    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    #[error("Document at position {0} has no _id and cannot be replaced individually")]
    MissingDocumentKey(usize),

    #[error("Verification failed for collection '{collection}': {reason}")]
    Verification { collection: String, reason: String },

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

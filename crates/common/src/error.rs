//! Error types for Splitview

use thiserror::Error;

/// Result type alias using Splitview Error
pub type Result<T> = std::result::Result<T, Error>;

/// Splitview error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Style property not allowed: {0}")]
    PropertyNotAllowed(String),

    #[error("Rejected value for style property {property}: {reason}")]
    InvalidStyleValue { property: String, reason: String },

    #[error("Invalid color value: {0}")]
    InvalidColor(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Malformed frame message: {0}")]
    MalformedMessage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Resource already exists: {kind} with id {id}")]
    AlreadyExists { kind: String, id: String },
}

impl Error {
    /// True for errors caused by a rejected style property or value.
    pub fn is_style_rejection(&self) -> bool {
        matches!(
            self,
            Error::PropertyNotAllowed(_) | Error::InvalidStyleValue { .. } | Error::InvalidColor(_)
        )
    }
}

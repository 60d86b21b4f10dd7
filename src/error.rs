//! Error types for the lector library.

use thiserror::Error;

/// Result type alias for lector operations
pub type Result<T> = std::result::Result<T, ReadabilityError>;

/// Errors that can occur during article extraction
#[derive(Error, Debug)]
pub enum ReadabilityError {
    /// Failed to parse HTML document
    #[error("Failed to parse HTML: {0}")]
    ParseError(String),

    /// Invalid URL provided
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The document exceeds the configured element cap
    #[error("Aborting parsing document; {0} elements found")]
    TooManyElements(usize),

    /// A custom serializer failed
    #[error("Serializer error: {0}")]
    SerializerError(String),
}

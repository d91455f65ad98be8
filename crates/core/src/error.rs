//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    #[error("invalid token length: {0} bytes")]
    InvalidTokenLength(usize),

    #[error("content sniffing failed: {0}")]
    Sniff(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

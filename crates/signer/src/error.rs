//! Signer error types.

use thiserror::Error;

/// Capability signer errors.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("server secret is missing or empty")]
    MissingSecret,

    #[error("failed to load server secret: {0}")]
    SecretLoad(String),

    #[error("invalid key length: {0}")]
    InvalidKey(String),
}

/// Result type for signer operations.
pub type SignerResult<T> = std::result::Result<T, SignerError>;

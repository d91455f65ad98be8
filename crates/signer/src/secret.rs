//! Server secret loading.

use crate::error::{SignerError, SignerResult};
use shrink_core::config::SecretConfig;
use std::fmt;

/// The server-held HMAC key.
#[derive(Clone)]
pub struct ServerSecret {
    inner: String,
}

impl ServerSecret {
    /// Wrap a secret, rejecting empty or whitespace-only values.
    pub fn new(secret: impl Into<String>) -> SignerResult<Self> {
        let inner = secret.into();
        if inner.trim().is_empty() {
            return Err(SignerError::MissingSecret);
        }
        Ok(Self { inner })
    }

    /// Load the secret from its configured source.
    ///
    /// Values read from files or environment variables are trimmed.
    pub fn from_config(config: &SecretConfig) -> SignerResult<Self> {
        match config {
            SecretConfig::Value { value } => {
                tracing::warn!("Using inline server secret (not recommended for production)");
                Self::new(value.clone())
            }
            SecretConfig::Env { var } => {
                let value = std::env::var(var).map_err(|e| {
                    SignerError::SecretLoad(format!("secret env var {var} not usable: {e}"))
                })?;
                tracing::info!(var = %var, "Loaded server secret from env");
                Self::new(value.trim())
            }
            SecretConfig::File { path } => {
                let value = std::fs::read_to_string(path).map_err(|e| {
                    SignerError::SecretLoad(format!(
                        "failed to read secret file {}: {e}",
                        path.display()
                    ))
                })?;
                tracing::info!(path = %path.display(), "Loaded server secret from file");
                Self::new(value.trim())
            }
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }
}

impl fmt::Debug for ServerSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServerSecret([REDACTED])")
    }
}

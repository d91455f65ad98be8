//! Capability minting and verification.

use crate::error::{SignerError, SignerResult};
use crate::secret::ServerSecret;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Length of a capability: hex of a 32-byte HMAC-SHA256 tag.
pub const CAPABILITY_LEN: usize = 64;

/// Hex-encoded HMAC proving the right to delete one resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capability(String);

impl Capability {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mints and verifies deletion capabilities with the server secret.
#[derive(Clone)]
pub struct CapabilitySigner {
    mac: HmacSha256,
}

impl CapabilitySigner {
    /// Create a signer.
    ///
    /// Fails with [`SignerError::MissingSecret`] for an empty secret, so an
    /// unconfigured server can never issue capabilities.
    pub fn new(secret: ServerSecret) -> SignerResult<Self> {
        if secret.as_bytes().iter().all(u8::is_ascii_whitespace) {
            return Err(SignerError::MissingSecret);
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Mint the capability for `identifier` (64 lowercase hex characters).
    pub fn mint(&self, identifier: &str) -> Capability {
        let mut mac = self.mac.clone();
        mac.update(identifier.as_bytes());
        Capability(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a presented capability.
    ///
    /// Only the exact form `mint` produces is accepted: 64 lowercase hex
    /// characters. The tag itself is compared in constant time by `verify_slice`.
    pub fn verify(&self, identifier: &str, presented: &str) -> bool {
        if !is_capability_shaped(presented) {
            return false;
        }
        let Ok(tag) = hex::decode(presented) else {
            return false;
        };

        let mut mac = self.mac.clone();
        mac.update(identifier.as_bytes());
        mac.verify_slice(&tag).is_ok()
    }
}

/// Lowercase hex of the right length. Says nothing about validity.
fn is_capability_shaped(presented: &str) -> bool {
    presented.len() == CAPABILITY_LEN
        && presented
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

impl fmt::Debug for CapabilitySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapabilitySigner([REDACTED])")
    }
}

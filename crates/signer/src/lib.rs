//! Deletion capabilities for shrink.
//!
//! A capability is `hex(HMAC-SHA256(secret, identifier))`. It is never stored:
//! the server recomputes it on every deletion request, so whoever holds a
//! deletion URL can delete that one resource and nothing else.

pub mod capability;
pub mod error;
pub mod secret;

pub use capability::{Capability, CapabilitySigner};
pub use error::{SignerError, SignerResult};
pub use secret::ServerSecret;

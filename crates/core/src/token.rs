//! Random token generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Generate a URL-safe random token from `byte_len` bytes of OS-seeded randomness.
///
/// The result only contains `A-Z a-z 0-9 - _`, so it is safe both as a path
/// segment and as a filename component. Uniqueness is not checked here;
/// callers that use the token as a key must handle conflicts.
pub fn generate_token(byte_len: usize) -> crate::Result<String> {
    if byte_len == 0 {
        return Err(crate::Error::InvalidTokenLength(byte_len));
    }
    let mut bytes = vec![0u8; byte_len];
    rand::rng().fill_bytes(&mut bytes);
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

//! Request tracing and the upload password gate.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::Instrument;
use uuid::Uuid;

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and potential log injection.
const MAX_TRACE_ID_LEN: usize = 128;

/// Fixed, non-secret HMAC key for password tags.
const PASSWORD_TAG_KEY: &[u8] = b"shrink upload password";

type HmacSha256 = Hmac<Sha256>;

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value.
    /// Truncated to MAX_TRACE_ID_LEN characters with non-printable characters removed.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Attach a trace ID to the request and run the rest of the stack inside its span.
pub async fn trace_middleware(mut req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(&req);
    let span = tracing::info_span!("request", trace_id = %trace_id);
    req.extensions_mut().insert(trace_id);

    next.run(req).instrument(span).await
}

fn password_tag(password: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(PASSWORD_TAG_KEY).ok()?;
    mac.update(password.as_bytes());
    Some(mac)
}

/// Check a presented `Authorization` value against the configured password.
///
/// Both sides are reduced to HMAC tags so `verify_slice` compares fixed-length
/// values in constant time.
fn password_matches(expected: &str, presented: &str) -> bool {
    let (Some(expected), Some(presented)) = (password_tag(expected), password_tag(presented))
    else {
        return false;
    };
    presented
        .verify_slice(&expected.finalize().into_bytes())
        .is_ok()
}

/// Gate create endpoints behind `server.upload_password`.
///
/// The raw `Authorization` header value is the password; a missing header
/// counts as empty. Requests pass untouched when no password is configured.
pub async fn require_upload_password(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.config.server.upload_password.as_deref() {
        let presented = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !password_matches(expected, presented) {
            tracing::warn!(path = %req.uri().path(), "Rejected request with bad upload password");
            return Err(ApiError::Unauthorized(
                "invalid or missing upload password".to_string(),
            ));
        }
    }

    Ok(next.run(req).await)
}

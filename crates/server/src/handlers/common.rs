//! Shared handler helpers and response bodies.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::HOST;
use serde::Serialize;
use shrink_core::ResourceKind;

/// Body returned by both create endpoints.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub url: String,
    pub delete_url: String,
}

/// Body returned by the deletion endpoints.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    /// Confirmation shown after a capability deletion.
    pub fn deleted(kind: ResourceKind) -> Self {
        Self {
            message: format!(
                "This {} has been deleted, you can now close this page.",
                kind.label()
            ),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Base URL for links handed back to clients, without a trailing slash.
///
/// `server.public_url` wins; otherwise the request `Host` header is used with
/// the scheme from `X-Forwarded-Proto` (default `http`).
pub fn base_url(state: &AppState, headers: &HeaderMap) -> ApiResult<String> {
    if let Some(base) = state.config.server.public_base() {
        return Ok(base.to_string());
    }

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing Host header".to_string()))?;

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| s.eq_ignore_ascii_case("https"))
        .map_or("http", |_| "https");

    Ok(format!("{scheme}://{host}"))
}

/// GET /health - Health check.
///
/// Unauthenticated; reports only status and version.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.storage.health_check().await?;
    state.metadata.health_check().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

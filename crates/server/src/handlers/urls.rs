//! URL shortening, redirect and deletion.

use super::common::{CreatedResponse, MessageResponse, base_url};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::webhooks::NotificationEvent;
use axum::Json;
use axum::extract::{Form, FromRequest, Multipart, Path, Request, State};
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use shrink_core::{ResourceKind, ShortUrl, generate_token};
use shrink_metadata::{MetadataError, ShortUrlRepo, ShortUrlRow};

/// Form field carrying the URL to shorten.
const URL_FIELD: &str = "url";

#[derive(Debug, Deserialize)]
struct UrlFields {
    url: Option<String>,
}

/// The `url` field from either an urlencoded or a multipart form.
///
/// ShareX posts multipart bodies; browsers and curl usually send urlencoded.
#[derive(Debug)]
pub struct ShortenForm {
    pub url: Option<String>,
}

impl<S> FromRequest<S> for ShortenForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim_start().starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(fields) = Form::<UrlFields>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            return Ok(Self { url: fields.url });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            if field.name() == Some(URL_FIELD) {
                let url = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                return Ok(Self { url: Some(url) });
            }
        }
        Ok(Self { url: None })
    }
}

/// Insert `raw` under a fresh token, retrying when the token is already taken.
///
/// The URL is normalized before the first insert; a malformed one is a 400
/// and nothing is written.
async fn store_new_short_url(state: &AppState, raw: &str) -> ApiResult<ShortUrl> {
    let shorten = &state.config.shorten;

    for attempt in 1..=shorten.max_token_attempts {
        let short = ShortUrl::new(generate_token(shorten.url_token_bytes)?, raw)?;

        match state
            .metadata
            .insert_short_url(&ShortUrlRow::from(short.clone()))
            .await
        {
            Ok(()) => return Ok(short),
            Err(MetadataError::AlreadyExists(_)) => {
                tracing::warn!(token = %short.token, attempt, "Generated token already taken, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::Internal(format!(
        "no free short URL token after {} attempts",
        shorten.max_token_attempts
    )))
}

/// POST /shorten - Create a short URL.
pub async fn shorten(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: ShortenForm,
) -> ApiResult<Json<CreatedResponse>> {
    let base = base_url(&state, &headers)?;
    let raw = form
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing url field".to_string()))?;

    let short = store_new_short_url(&state, &raw).await?;

    let capability = state.signer.mint(&short.token);
    let response = CreatedResponse {
        url: format!("{base}/url/{}", short.token),
        delete_url: format!("{base}/delete-short-url/{capability}/{}", short.token),
    };

    tracing::info!(
        kind = %ResourceKind::ShortUrl,
        token = %short.token,
        target = %short.url,
        url = %response.url,
        "Short URL saved"
    );

    state.notifier.dispatch(NotificationEvent::UrlShortened {
        original_url: short.url,
        short_url: response.url.clone(),
        deletion_url: response.delete_url.clone(),
    });

    Ok(Json(response))
}

/// GET /url/{token} - Redirect to the stored URL.
pub async fn redirect_short_url(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let url = state
        .metadata
        .get_short_url(&token)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok((StatusCode::FOUND, [(LOCATION, url)]))
}

/// GET /delete-short-url/{capability}/{token} - Delete a short URL.
pub async fn delete_short_url(
    State(state): State<AppState>,
    Path((capability, token)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    if !state.signer.verify(&token, &capability) {
        return Err(ApiError::NotFound);
    }

    if !state.metadata.delete_short_url(&token).await? {
        return Err(ApiError::Gone);
    }

    tracing::info!(kind = %ResourceKind::ShortUrl, token = %token, "Short URL deleted");

    Ok(Json(MessageResponse::deleted(ResourceKind::ShortUrl)))
}

//! File upload, deletion and serving.

use super::common::{CreatedResponse, MessageResponse, base_url};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::webhooks::NotificationEvent;
use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use shrink_core::{ORIGINAL_FILENAME_HEADER, ResourceKind, UploadedFile, generate_token};
use shrink_storage::StorageError;
use std::io::Cursor;

/// Multipart field carrying the upload.
const FILE_FIELD: &str = "file";

/// The `file` part of an upload form.
struct FilePart {
    original_name: Option<String>,
    data: Bytes,
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

/// Pull the `file` field out of the form, ignoring any other parts.
async fn read_file_part(multipart: &mut Multipart) -> ApiResult<Option<FilePart>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let original_name = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.is_empty());
        let data = field.bytes().await.map_err(multipart_error)?;

        // Browsers send an empty, unnamed part when no file was picked.
        if original_name.is_none() && data.is_empty() {
            return Ok(None);
        }
        return Ok(Some(FilePart {
            original_name,
            data,
        }));
    }
    Ok(None)
}

/// Whether the client asked to keep part of its filename and config allows it.
fn wants_original_filename(state: &AppState, headers: &HeaderMap) -> bool {
    state.config.upload.use_original_filename
        && headers
            .get(ORIGINAL_FILENAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "1")
}

/// Store `data` under a fresh token, retrying when the name is already taken.
async fn store_new_file(
    state: &AppState,
    original_name: Option<&str>,
    extension: &str,
    data: Bytes,
) -> ApiResult<UploadedFile> {
    let upload = &state.config.upload;

    for attempt in 1..=upload.max_token_attempts {
        let token = generate_token(upload.file_token_bytes)?;
        let file = UploadedFile::compose(
            token,
            original_name,
            upload.original_filename_length,
            extension,
        )?;
        let key = file.full_filename();

        match state.storage.save(&key, data.clone()).await {
            Ok(()) => return Ok(file),
            Err(StorageError::AlreadyExists(_)) => {
                tracing::warn!(filename = %key, attempt, "Generated filename already taken, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::Internal(format!(
        "no free filename after {} attempts",
        upload.max_token_attempts
    )))
}

/// POST /upload - Store an uploaded file under a sniffed extension.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<CreatedResponse>> {
    // Resolved before anything is stored so a bad request leaves nothing behind.
    let base = base_url(&state, &headers)?;

    let part = read_file_part(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest("missing file field".to_string()))?;

    let detected = state.sniffer.detect(&mut Cursor::new(part.data.as_ref()))?;
    let extension = state.sniffer.check(&detected).map_err(|rejection| {
        tracing::info!(
            original_name = part.original_name.as_deref().unwrap_or(""),
            mime = %detected.mime,
            reason = %rejection,
            "Rejected upload"
        );
        ApiError::UnprocessableEntity("invalid file type".to_string())
    })?;

    let original_name = if wants_original_filename(&state, &headers) {
        part.original_name.as_deref()
    } else {
        None
    };

    let size = part.data.len();
    let file = store_new_file(&state, original_name, &extension, part.data).await?;
    let filename = file.full_filename();

    let capability = state.signer.mint(&filename);
    let response = CreatedResponse {
        url: format!("{base}/uploads/{filename}"),
        delete_url: format!("{base}/delete-file/{capability}/{filename}"),
    };

    tracing::info!(
        kind = %ResourceKind::File,
        filename = %filename,
        size,
        url = %response.url,
        "File saved"
    );

    state.notifier.dispatch(NotificationEvent::FileUploaded {
        url: response.url.clone(),
        deletion_url: response.delete_url.clone(),
    });

    Ok(Json(response))
}

/// GET /delete-file/{capability}/{filename} - Delete an upload.
///
/// A capability that does not verify is indistinguishable from an unknown file.
pub async fn delete_file(
    State(state): State<AppState>,
    Path((capability, filename)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    if !state.signer.verify(&filename, &capability) {
        return Err(ApiError::NotFound);
    }

    if !state.storage.delete(&filename).await? {
        return Err(ApiError::Gone);
    }

    tracing::info!(kind = %ResourceKind::File, filename = %filename, "File deleted");

    Ok(Json(MessageResponse::deleted(ResourceKind::File)))
}

/// GET /uploads/{filename} - Stream a stored file.
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let stream = state.storage.get_stream(&filename).await?;
    let content_type = mime_guess::from_path(&filename)
        .first_or_octet_stream()
        .to_string();

    Ok((
        [
            (CONTENT_TYPE, content_type),
            (X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        Body::from_stream(stream),
    ))
}

//! ShareX custom uploader configurations.

use super::common::base_url;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::{Value, json};

/// Placeholder the user replaces with `server.upload_password`.
const PASSWORD_PLACEHOLDER: &str = "YOUR-UPLOAD-PASSWORD-HERE";

fn display_host(base: &str) -> &str {
    base.split_once("://").map_or(base, |(_, rest)| rest)
}

/// GET /sharex/upload - Uploader config for files and images.
pub async fn upload_config(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let base = base_url(&state, &headers)?;

    Ok(Json(json!({
        "Name": format!("{} (File uploader)", display_host(&base)),
        "Version": "1.0.0",
        "DestinationType": "ImageUploader, FileUploader",
        "RequestMethod": "POST",
        "RequestURL": format!("{base}/upload"),
        "Body": "MultipartFormData",
        "FileFormName": "file",
        "URL": "$json:url$",
        "DeletionURL": "$json:delete_url$",
        "Headers": {
            "Authorization": PASSWORD_PLACEHOLDER,
            "X-Use-Original-Filename": "1",
        },
        "ErrorMessage": "$json:message$",
    })))
}

/// GET /sharex/shorten - Uploader config for the URL shortener.
pub async fn shorten_config(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let base = base_url(&state, &headers)?;

    Ok(Json(json!({
        "Name": format!("{} (URL shortener)", display_host(&base)),
        "Version": "1.0.0",
        "DestinationType": "URLShortener",
        "RequestMethod": "POST",
        "RequestURL": format!("{base}/shorten"),
        "Body": "MultipartFormData",
        "Headers": {
            "Authorization": PASSWORD_PLACEHOLDER,
        },
        "Arguments": {
            "url": "$input$",
        },
        "URL": "$json:url$",
        "DeletionURL": "$json:delete_url$",
        "ErrorMessage": "$json:message$",
    })))
}

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use watermark_processor::process_image as watermark_image;

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";
/// Optional multipart field overriding the watermark text.
pub const TEXT_FIELD: &str = "watermark";

const DEFAULT_FILENAME: &str = "image";
const MAX_FILENAME_LENGTH: usize = 200;

/// One uploaded image with its form fields.
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
    pub text: Option<String>,
}

/// Watermark an uploaded image
///
/// Accepts `multipart/form-data` with a required `file` field and an
/// optional `watermark` text field. Responds with the JPEG as an attachment.
pub async fn process_image(
    State(state): State<Arc<ServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<Response> {
    let mut multipart = multipart.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let Upload {
        filename,
        content_type,
        data,
        text,
    } = read_upload(&mut multipart, state.config.max_body_size_mb).await?;

    tracing::debug!(
        filename = %filename,
        content_type = content_type.as_deref().unwrap_or("-"),
        bytes = data.len(),
        custom_text = text.is_some(),
        "upload received"
    );

    let transformer = state.transformer.clone();
    let image = tokio::task::spawn_blocking(move || {
        watermark_image(&transformer, &data, content_type.as_deref(), text.as_deref())
    })
    .await??;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"watermarked_{filename}\""
    ))
    .map_err(|e| ServerError::Internal(format!("invalid content-disposition: {e}")))?;

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static(image.content_type())),
            (CONTENT_DISPOSITION, disposition),
        ],
        image.data,
    )
        .into_response())
}

/// Read the `file` and `watermark` fields, ignoring any others.
pub async fn read_upload(multipart: &mut Multipart, max_body_mb: usize) -> ServerResult<Upload> {
    let mut file: Option<(String, Option<String>, Bytes)> = None;
    let mut text = None;

    let to_server_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(max_body_mb)
        } else {
            ServerError::BadRequest(format!("invalid multipart body: {}", e.body_text()))
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(to_server_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                if file.is_some() {
                    return Err(ServerError::BadRequest(format!(
                        "multiple '{FILE_FIELD}' fields in one request"
                    )));
                }
                let filename = field
                    .file_name()
                    .map(sanitize_filename)
                    .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
                let content_type = field.content_type().map(str::to_owned);
                let data = field.bytes().await.map_err(to_server_error)?;
                file = Some((filename, content_type, data));
            }
            Some(TEXT_FIELD) => {
                if text.is_some() {
                    return Err(ServerError::BadRequest(format!(
                        "multiple '{TEXT_FIELD}' fields in one request"
                    )));
                }
                text = Some(field.text().await.map_err(to_server_error)?);
            }
            other => {
                tracing::debug!(field = ?other, "ignoring multipart field");
            }
        }
    }

    let Some((filename, content_type, data)) = file else {
        return Err(ServerError::BadRequest(format!(
            "missing '{FILE_FIELD}' field"
        )));
    };

    Ok(Upload {
        filename,
        content_type,
        data,
        text,
    })
}

/// Reduce a client-supplied filename to a safe header token.
///
/// Directory components are dropped and anything outside `[A-Za-z0-9._-]`
/// becomes `_`. Names that end up empty or hidden fall back to `image`.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_LENGTH)
        .collect();

    if cleaned.is_empty() || cleaned.starts_with('.') {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned
    }
}

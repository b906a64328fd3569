//! Admin image upload: multipart `file` plus optional `folder`.

use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::response::success_one;
use crate::service::upload;
use crate::state::AppState;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

pub async fn upload_image(
    State(state): State<AppState>,
    _admin: AdminUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    let mut folder: Option<String> = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name().unwrap_or("") {
            "file" => {
                let declared = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some((declared, data.to_vec()));
            }
            "folder" => {
                folder = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }
    let (declared, bytes) = file.ok_or_else(|| AppError::BadRequest("missing 'file' field in multipart body".into()))?;
    let stored = upload::store(
        state.storage.as_ref(),
        folder.as_deref().map(str::trim).filter(|f| !f.is_empty()),
        declared.as_deref(),
        bytes,
        state.config.upload_max_bytes,
    )
    .await?;
    Ok(success_one(stored))
}

//! Clip CRUD handlers: upload, list, download, details, rename, delete

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    error::{OpError, OpResult},
    identity::Identity,
    models::{ClipDetails, MessageResponse, RenameRequest, UploadResponse},
    AppState,
};

/// POST /api/upload
///
/// Multipart upload; the single `mp3` field carries the clip. The upload is
/// transcoded to the target profile before it is stored.
pub async fn upload(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> OpResult<Json<UploadResponse>> {
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| OpError::Validation(format!("bad multipart body: {}", e)))?
    {
        if field.name() != Some("mp3") {
            continue;
        }
        let filename = field.file_name().unwrap_or("clip.mp3").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| OpError::Validation(format!("bad multipart body: {}", e)))?;
        file = Some((filename, content_type, data.to_vec()));
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| OpError::Validation("no mp3 field in upload".to_string()))?;

    if data.len() > state.max_upload_bytes {
        return Err(OpError::Validation(format!(
            "upload exceeds {} byte limit",
            state.max_upload_bytes
        )));
    }

    let id = state
        .pipeline
        .ingest(identity.0, &filename, data, &content_type)
        .await?;

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        file: id,
    }))
}

/// GET /api/mp3s
pub async fn list_clips(
    State(state): State<AppState>,
    identity: Identity,
) -> OpResult<Json<Vec<crate::db::ClipSummary>>> {
    Ok(Json(state.pipeline.list(identity.0).await?))
}

/// GET /api/mp3/:id
pub async fn download_clip(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> OpResult<impl IntoResponse> {
    let clip = state.pipeline.download(identity.0, id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, clip.content_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", clip.filename),
            ),
        ],
        clip.data,
    ))
}

/// GET /api/mp3/:id/details
pub async fn clip_details(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> OpResult<Json<ClipDetails>> {
    let clip = state.pipeline.download(identity.0, id).await?;
    Ok(Json(ClipDetails {
        id: clip.id,
        filename: clip.filename,
        content_type: clip.content_type,
        size: clip.data.len(),
        created_at: clip.created_at,
    }))
}

/// PUT /api/edit-mp3/:id
pub async fn rename_clip(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(request): Json<RenameRequest>,
) -> OpResult<Json<MessageResponse>> {
    state
        .pipeline
        .rename(identity.0, id, request.filename.trim())
        .await?;
    Ok(Json(MessageResponse {
        message: "Clip renamed".to_string(),
    }))
}

/// DELETE /api/mp3/:id
pub async fn delete_clip(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> OpResult<Json<MessageResponse>> {
    state.pipeline.delete(identity.0, id).await?;
    Ok(Json(MessageResponse {
        message: "Clip deleted".to_string(),
    }))
}

/// Build clip CRUD routes
pub fn clip_routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload))
        .route("/api/mp3s", get(list_clips))
        .route("/api/mp3/:id", get(download_clip).delete(delete_clip))
        .route("/api/mp3/:id/details", get(clip_details))
        .route("/api/edit-mp3/:id", put(rename_clip))
}

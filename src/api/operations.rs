//! Pipeline operation handlers: trim, concatenate, synthesize, clone

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    error::OpResult,
    identity::Identity,
    models::{CloneRequest, ConcatRequest, MessageResponse, SynthesizeRequest, TrimRequest, UploadResponse},
    services::{CloneServiceHealth, TrimOutcome},
    AppState,
};

/// POST /api/trim/:id
pub async fn trim(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(request): Json<TrimRequest>,
) -> OpResult<Json<TrimOutcome>> {
    let outcome = state
        .pipeline
        .trim(identity.0, id, request.start, request.end, request.gain_percent)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/concat
pub async fn concatenate(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<ConcatRequest>,
) -> OpResult<Json<MessageResponse>> {
    state
        .pipeline
        .concatenate(identity.0, request.first, request.second)
        .await?;
    Ok(Json(MessageResponse {
        message: "Clips concatenated".to_string(),
    }))
}

/// POST /api/tts
///
/// Responds with the finished mp3 directly; nothing is stored.
pub async fn synthesize(
    State(state): State<AppState>,
    _identity: Identity,
    Json(request): Json<SynthesizeRequest>,
) -> OpResult<impl IntoResponse> {
    let bytes = state
        .pipeline
        .synthesize(&request.text, &request.language, request.rate)
        .await?;
    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"speech.mp3\"".to_string(),
            ),
        ],
        bytes,
    ))
}

/// POST /api/clone/:id
pub async fn clone_voice(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(request): Json<CloneRequest>,
) -> OpResult<Json<UploadResponse>> {
    let new_id = state
        .pipeline
        .clone_voice(identity.0, id, &request.target_voice)
        .await?;
    Ok(Json(UploadResponse {
        message: "Clone stored".to_string(),
        file: new_id,
    }))
}

/// GET /api/clone/health
pub async fn clone_health(State(state): State<AppState>) -> OpResult<Json<CloneServiceHealth>> {
    Ok(Json(state.pipeline.clone_service_health().await?))
}

/// Build operation routes
pub fn operation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/trim/:id", post(trim))
        .route("/api/concat", post(concatenate))
        .route("/api/tts", post(synthesize))
        .route("/api/clone/:id", post(clone_voice))
        .route("/api/clone/health", get(clone_health))
}

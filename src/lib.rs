//! mixcut library interface
//!
//! Exposes the pipeline, store, and router for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod services;

pub use crate::config::Config;
pub use crate::error::{OpError, OpResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::SqliteClipStore;
use crate::services::{
    AudioPipeline, FfmpegInvoker, SpeechSynthesizer, TempWorkspace, VoiceCloneClient,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AudioPipeline>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wire the pipeline from configuration and an open database pool
    pub fn from_config(config: &Config, db: SqlitePool) -> Self {
        let store = Arc::new(SqliteClipStore::new(db));
        let transcoder = Arc::new(FfmpegInvoker::new(
            config.ffmpeg_path.clone(),
            config.transcode_timeout(),
        ));
        let workspace = TempWorkspace::new(config.temp_dir.clone());
        let synthesizer = Arc::new(SpeechSynthesizer::new(
            config.tts.remote_language.clone(),
            config.tts.remote_url.clone(),
            config.tts.engine_path.clone(),
            config.tts.default_voice.clone(),
        ));
        let clone_client = config
            .clone_service_url
            .clone()
            .map(|url| Arc::new(VoiceCloneClient::new(url)));

        let pipeline = Arc::new(AudioPipeline::new(
            store,
            transcoder,
            workspace,
            synthesizer,
            clone_client,
        ));

        Self {
            pipeline,
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes + 16 * 1024; // multipart framing slack

    Router::new()
        .merge(api::clip_routes())
        .merge(api::operation_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

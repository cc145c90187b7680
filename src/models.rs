//! API request/response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ClipDetails {
    pub id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct TrimRequest {
    pub start: f64,
    pub end: f64,
    /// Loudness percent; omitted means 100 (no change)
    pub gain_percent: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ConcatRequest {
    pub first: Uuid,
    pub second: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    pub language: String,
    #[serde(default = "default_rate")]
    pub rate: f64,
}

fn default_rate() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
pub struct CloneRequest {
    #[serde(default = "default_voice")]
    pub target_voice: String,
}

fn default_voice() -> String {
    "trump".to_string()
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

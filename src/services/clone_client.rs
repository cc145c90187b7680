//! Voice cloning collaborator client
//!
//! The cloning service is a separate process exposing `POST /clone`
//! (multipart: source audio + target voice) and a `GET /health` readiness
//! probe. It returns finished mp3 bytes; failures surface as provider
//! errors, never as partial artifacts.

use crate::error::{OpError, OpResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Readiness report from the cloning service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneServiceHealth {
    pub status: String,
    #[serde(default)]
    pub available_voices: Vec<String>,
    #[serde(default)]
    pub ready: bool,
}

pub struct VoiceCloneClient {
    http: reqwest::Client,
    base_url: String,
}

impl VoiceCloneClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Probe the cloning service
    pub async fn health(&self) -> OpResult<CloneServiceHealth> {
        let health = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| OpError::Provider(format!("clone service unreachable: {}", e)))?
            .json::<CloneServiceHealth>()
            .await
            .map_err(|e| OpError::Provider(format!("malformed health response: {}", e)))?;

        debug!(ready = health.ready, "Clone service health");
        Ok(health)
    }

    /// Submit audio for cloning into `target_voice`; resolves with mp3 bytes
    pub async fn clone_voice(&self, audio: Vec<u8>, target_voice: &str) -> OpResult<Vec<u8>> {
        info!(target_voice, bytes = audio.len(), "Submitting clone request");

        let form = reqwest::multipart::Form::new()
            .part(
                "audio",
                reqwest::multipart::Part::bytes(audio)
                    .file_name("source.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| OpError::Provider(format!("bad multipart payload: {}", e)))?,
            )
            .text("target_voice", target_voice.to_string());

        let response = self
            .http
            .post(format!("{}/clone", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| OpError::Provider(format!("clone service unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(OpError::Provider(format!(
                "clone service returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OpError::Provider(format!("clone download failed: {}", e)))?;

        if bytes.is_empty() {
            return Err(OpError::Provider("clone service returned no audio".to_string()));
        }

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_service_is_provider_error() {
        // nothing listens on this port
        let client = VoiceCloneClient::new("http://127.0.0.1:1".to_string());
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, OpError::Provider(_)));
    }

    #[test]
    fn health_response_parses_with_missing_fields() {
        let health: CloneServiceHealth =
            serde_json::from_str(r#"{"status": "running"}"#).unwrap();
        assert_eq!(health.status, "running");
        assert!(!health.ready);
        assert!(health.available_voices.is_empty());
    }
}

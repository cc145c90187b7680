//! Speech synthesis providers
//!
//! Dispatch is keyed by language tag: the one configured remote language is
//! served by a network-hosted provider (resolve the generated-audio URL, then
//! download the finished mp3), every other tag by the local engine, which
//! writes a WAV that the pipeline re-encodes to the target profile.

use crate::error::{OpError, OpResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Language → engine voice name. Tags without an entry fall back to the
/// primary subtag, then to the configured default voice.
const VOICE_TABLE: &[(&str, &str)] = &[
    ("en-US", "en-us"),
    ("en-GB", "en-gb"),
    ("de-DE", "de"),
    ("fr-FR", "fr"),
    ("es-ES", "es"),
    ("it-IT", "it"),
    ("pt-PT", "pt"),
    ("hu-HU", "hu"),
];

/// Engine speed at rate 1.0, words per minute
const BASE_WPM: f64 = 175.0;

/// Which provider serves a synthesis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisRoute {
    /// Network-hosted provider; output is already in the target container
    Remote,
    /// Local engine producing WAV, re-encoded afterward
    Local { voice: String },
}

#[derive(Debug, Deserialize)]
struct RemoteSynthesisResponse {
    audio_url: String,
}

/// Provider dispatch plus both provider implementations
pub struct SpeechSynthesizer {
    remote_language: String,
    remote_url: Option<String>,
    http: reqwest::Client,
    engine_path: PathBuf,
    default_voice: String,
}

impl SpeechSynthesizer {
    pub fn new(
        remote_language: String,
        remote_url: Option<String>,
        engine_path: PathBuf,
        default_voice: String,
    ) -> Self {
        Self {
            remote_language,
            remote_url,
            http: reqwest::Client::new(),
            engine_path,
            default_voice,
        }
    }

    /// Explicit provider selection; exactly one language goes remote
    pub fn route(&self, language: &str) -> SynthesisRoute {
        if language == self.remote_language {
            SynthesisRoute::Remote
        } else {
            SynthesisRoute::Local {
                voice: self.voice_for(language),
            }
        }
    }

    fn voice_for(&self, language: &str) -> String {
        if let Some((_, voice)) = VOICE_TABLE.iter().find(|(tag, _)| *tag == language) {
            return (*voice).to_string();
        }
        // "de" matches "de-AT" and friends
        let primary = language.split('-').next().unwrap_or(language).to_lowercase();
        if VOICE_TABLE.iter().any(|(_, voice)| *voice == primary) {
            return primary;
        }
        self.default_voice.clone()
    }

    /// Remote path: ask the provider for the generated-audio URL, then
    /// download the mp3 straight into `dest`. No re-encode needed.
    pub async fn synthesize_remote(
        &self,
        text: &str,
        language: &str,
        rate: f64,
        dest: &Path,
    ) -> OpResult<()> {
        let base = self
            .remote_url
            .as_deref()
            .ok_or_else(|| OpError::Provider("remote TTS provider not configured".to_string()))?;

        info!(language, "Dispatching synthesis to remote provider");

        let response = self
            .http
            .post(format!("{}/synthesize", base))
            .json(&serde_json::json!({
                "text": text,
                "language": language,
                "rate": rate,
            }))
            .send()
            .await
            .map_err(|e| OpError::Provider(format!("remote TTS unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(OpError::Provider(format!(
                "remote TTS returned {}",
                response.status()
            )));
        }

        let resolved: RemoteSynthesisResponse = response
            .json()
            .await
            .map_err(|e| OpError::Provider(format!("malformed provider response: {}", e)))?;

        debug!(url = %resolved.audio_url, "Downloading generated audio");
        let audio = self
            .http
            .get(&resolved.audio_url)
            .send()
            .await
            .map_err(|e| OpError::Provider(format!("audio download failed: {}", e)))?
            .error_for_status()
            .map_err(|e| OpError::Provider(format!("audio download failed: {}", e)))?
            .bytes()
            .await
            .map_err(|e| OpError::Provider(format!("audio download failed: {}", e)))?;

        tokio::fs::write(dest, &audio).await?;
        Ok(())
    }

    /// Local path: run the engine with the mapped voice, writing WAV to
    /// `dest`. An unavailable voice gets one retry with the default voice
    /// before the provider error surfaces.
    pub async fn synthesize_to_wav(
        &self,
        text: &str,
        voice: &str,
        rate: f64,
        dest: &Path,
    ) -> OpResult<()> {
        match self.run_engine(text, voice, rate, dest).await {
            Ok(()) => Ok(()),
            Err(first_err) if voice != self.default_voice => {
                warn!(
                    voice,
                    fallback = %self.default_voice,
                    error = %first_err,
                    "Mapped voice unavailable, retrying with default voice"
                );
                self.run_engine(text, &self.default_voice, rate, dest).await
            }
            Err(err) => Err(err),
        }
    }

    async fn run_engine(&self, text: &str, voice: &str, rate: f64, dest: &Path) -> OpResult<()> {
        let wpm = (rate * BASE_WPM).round().clamp(80.0, 450.0) as u32;
        debug!(voice, wpm, "Running local synthesis engine");

        let output = Command::new(&self.engine_path)
            .arg("-v")
            .arg(voice)
            .arg("-s")
            .arg(wpm.to_string())
            .arg("-w")
            .arg(dest)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                OpError::Provider(format!(
                    "failed to run {}: {}",
                    self.engine_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(OpError::Provider(format!(
                "synthesis engine failed (exit {:?}): {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        if tokio::fs::metadata(dest).await.is_err() {
            return Err(OpError::Provider(
                "synthesis engine produced no audio".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthesizer() -> SpeechSynthesizer {
        SpeechSynthesizer::new(
            "ro-RO".to_string(),
            Some("http://localhost:5002".to_string()),
            PathBuf::from("espeak-ng"),
            "en".to_string(),
        )
    }

    #[test]
    fn designated_language_routes_remote() {
        assert_eq!(synthesizer().route("ro-RO"), SynthesisRoute::Remote);
    }

    #[test]
    fn other_languages_route_local() {
        assert_eq!(
            synthesizer().route("en-US"),
            SynthesisRoute::Local {
                voice: "en-us".to_string()
            }
        );
        assert_eq!(
            synthesizer().route("de-DE"),
            SynthesisRoute::Local {
                voice: "de".to_string()
            }
        );
    }

    #[test]
    fn unmapped_region_falls_back_to_primary_subtag() {
        assert_eq!(
            synthesizer().route("de-AT"),
            SynthesisRoute::Local {
                voice: "de".to_string()
            }
        );
    }

    #[test]
    fn unknown_language_uses_default_voice() {
        assert_eq!(
            synthesizer().route("xx-XX"),
            SynthesisRoute::Local {
                voice: "en".to_string()
            }
        );
    }

    #[tokio::test]
    async fn missing_remote_config_is_provider_error() {
        let s = SpeechSynthesizer::new(
            "ro-RO".to_string(),
            None,
            PathBuf::from("espeak-ng"),
            "en".to_string(),
        );
        let err = s
            .synthesize_remote("Salut", "ro-RO", 1.0, Path::new("/tmp/x.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, OpError::Provider(_)));
    }

    #[tokio::test]
    async fn failing_engine_surfaces_provider_error() {
        let dir = tempfile::tempdir().unwrap();
        let s = SpeechSynthesizer::new(
            "ro-RO".to_string(),
            None,
            PathBuf::from("/bin/false"),
            "en".to_string(),
        );
        // fails for the mapped voice and again for the default fallback
        let err = s
            .synthesize_to_wav("Hello", "en-us", 1.0, &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, OpError::Provider(_)));
    }

    #[tokio::test]
    async fn silent_engine_without_output_is_provider_error() {
        let dir = tempfile::tempdir().unwrap();
        let s = SpeechSynthesizer::new(
            "ro-RO".to_string(),
            None,
            PathBuf::from("/bin/true"),
            "en".to_string(),
        );
        let err = s
            .synthesize_to_wav("Hello", "en", 1.0, &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, OpError::Provider(_)));
    }
}

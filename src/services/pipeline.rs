//! Audio operation pipeline
//!
//! One flow instance per request. Every flow is the same shape: validate and
//! authorize before any file exists, materialize inputs into a workspace
//! scope, run the engine, read the output, persist as the single last step.
//! The scope is released on every exit path, so a failed flow leaves neither
//! temp files nor partial artifacts behind.

use crate::db::{ArtifactStore, ClipRecord};
use crate::error::{OpError, OpResult};
use crate::services::clone_client::VoiceCloneClient;
use crate::services::transcoder::{Transcode, TranscodeCommand};
use crate::services::tts::{SpeechSynthesizer, SynthesisRoute};
use crate::services::workspace::{TempWorkspace, WorkspaceScope};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Flow progress, traced per transition. Failure is reachable from any
/// non-terminal stage and always routes through scope release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    InputMaterialized,
    Transcoding,
    OutputRead,
    Persisted,
    Complete,
}

struct Flow {
    op: &'static str,
    op_id: Uuid,
    stage: Stage,
}

impl Flow {
    fn start(op: &'static str) -> Self {
        let op_id = Uuid::new_v4();
        debug!(op, op_id = %op_id, stage = ?Stage::Received, "Flow started");
        Self {
            op,
            op_id,
            stage: Stage::Received,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!(op = self.op, op_id = %self.op_id, stage = ?next, "Flow stage");
        self.stage = next;
    }
}

/// Size report for an in-place trim
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrimOutcome {
    pub original_size: usize,
    pub new_size: usize,
}

/// The four operation flows plus the owner-checked CRUD they share a
/// store with
pub struct AudioPipeline {
    store: Arc<dyn ArtifactStore>,
    transcoder: Arc<dyn Transcode>,
    workspace: TempWorkspace,
    synthesizer: Arc<SpeechSynthesizer>,
    clone_client: Option<Arc<VoiceCloneClient>>,
    // Serializes mutating flows per artifact id. Entries are never evicted;
    // the map stays small because ids come from one user's clip library.
    artifact_locks: Arc<RwLock<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl AudioPipeline {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        transcoder: Arc<dyn Transcode>,
        workspace: TempWorkspace,
        synthesizer: Arc<SpeechSynthesizer>,
        clone_client: Option<Arc<VoiceCloneClient>>,
    ) -> Self {
        Self {
            store,
            transcoder,
            workspace,
            synthesizer,
            clone_client,
            artifact_locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn lock_artifact(&self, id: Uuid) -> Arc<Mutex<()>> {
        if let Some(lock) = self.artifact_locks.read().await.get(&id) {
            return lock.clone();
        }
        let mut locks = self.artifact_locks.write().await;
        locks.entry(id).or_default().clone()
    }

    /// Load a clip and verify the requesting identity owns it. Runs before
    /// any temp file is materialized, so rejected requests cost no file I/O.
    async fn fetch_owned(&self, identity: Uuid, id: Uuid) -> OpResult<ClipRecord> {
        let clip = self.store.get(id).await?.ok_or(OpError::NotFound(id))?;
        if clip.owner != identity {
            return Err(OpError::Forbidden);
        }
        Ok(clip)
    }

    // ------------------------------------------------------------------
    // Ingest
    // ------------------------------------------------------------------

    /// Transcode an uploaded clip to the fixed profile (stripping the
    /// recording-latency lead) and store it as a new artifact
    pub async fn ingest(
        &self,
        owner: Uuid,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> OpResult<Uuid> {
        if bytes.is_empty() {
            return Err(OpError::Validation("empty upload".to_string()));
        }
        if content_type != "audio/mpeg" {
            return Err(OpError::Validation(format!(
                "only audio/mpeg uploads are accepted, got {}",
                content_type
            )));
        }
        // declared type must match the actual bytes
        let looks_like_mp3 = infer::get(&bytes)
            .map(|kind| kind.mime_type() == "audio/mpeg")
            .unwrap_or(false);
        if !looks_like_mp3 {
            return Err(OpError::Validation(
                "upload does not contain MPEG audio".to_string(),
            ));
        }

        let mut flow = Flow::start("ingest");
        let mut scope = self.workspace.scope(flow.op_id).await?;
        let result = self
            .run_ingest(&mut flow, &mut scope, owner, filename, bytes)
            .await;
        scope.release().await;
        self.finish(&flow, result)
    }

    async fn run_ingest(
        &self,
        flow: &mut Flow,
        scope: &mut WorkspaceScope,
        owner: Uuid,
        filename: &str,
        bytes: Vec<u8>,
    ) -> OpResult<Uuid> {
        let input = scope.write("in.mp3", &bytes).await?;
        flow.advance(Stage::InputMaterialized);

        let output = scope.create("out.mp3");
        flow.advance(Stage::Transcoding);
        self.transcoder
            .invoke(&TranscodeCommand::ingest(input, output.clone()))
            .await?;

        let transcoded = tokio::fs::read(&output).await?;
        flow.advance(Stage::OutputRead);

        let clip = ClipRecord::new(
            owner,
            filename.to_string(),
            "audio/mpeg".to_string(),
            transcoded,
        );
        let id = self.store.put(clip).await?;
        flow.advance(Stage::Persisted);
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Trim
    // ------------------------------------------------------------------

    /// Cut `[start, end)` out of an owned clip, applying the loudness
    /// factor, and replace the artifact in place
    pub async fn trim(
        &self,
        identity: Uuid,
        id: Uuid,
        start: f64,
        end: f64,
        gain_percent: Option<u32>,
    ) -> OpResult<TrimOutcome> {
        if !start.is_finite() || start < 0.0 {
            return Err(OpError::Validation("start must be >= 0".to_string()));
        }
        if !end.is_finite() || end <= start {
            return Err(OpError::Validation("end must be greater than start".to_string()));
        }

        let lock = self.lock_artifact(id).await;
        let _guard = lock.lock().await;

        let clip = self.fetch_owned(identity, id).await?;

        let mut flow = Flow::start("trim");
        let mut scope = self.workspace.scope(flow.op_id).await?;
        let result = self
            .run_trim(&mut flow, &mut scope, clip, start, end, gain_percent)
            .await;
        scope.release().await;
        self.finish(&flow, result)
    }

    async fn run_trim(
        &self,
        flow: &mut Flow,
        scope: &mut WorkspaceScope,
        clip: ClipRecord,
        start: f64,
        end: f64,
        gain_percent: Option<u32>,
    ) -> OpResult<TrimOutcome> {
        let input = scope.write("in.mp3", &clip.data).await?;
        flow.advance(Stage::InputMaterialized);

        let output = scope.create("out.mp3");
        flow.advance(Stage::Transcoding);
        self.transcoder
            .invoke(&TranscodeCommand::trim(
                input,
                output.clone(),
                start,
                end,
                gain_percent,
            ))
            .await?;

        let trimmed = tokio::fs::read(&output).await?;
        flow.advance(Stage::OutputRead);

        let outcome = TrimOutcome {
            original_size: clip.data.len(),
            new_size: trimmed.len(),
        };
        self.store.replace(clip.id, trimmed).await?;
        flow.advance(Stage::Persisted);
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Concatenate
    // ------------------------------------------------------------------

    /// Append `second` to `first` via the list-based demuxer (stream copy,
    /// no re-encode) and replace `first` in place
    pub async fn concatenate(&self, identity: Uuid, first: Uuid, second: Uuid) -> OpResult<()> {
        // only the mutated artifact is serialized; locking the source too
        // could deadlock against a crossing concatenate
        let lock = self.lock_artifact(first).await;
        let _guard = lock.lock().await;

        let first_clip = self.fetch_owned(identity, first).await?;
        let second_clip = self.fetch_owned(identity, second).await?;

        let mut flow = Flow::start("concatenate");
        let mut scope = self.workspace.scope(flow.op_id).await?;
        let result = self
            .run_concatenate(&mut flow, &mut scope, first_clip, second_clip)
            .await;
        scope.release().await;
        self.finish(&flow, result)
    }

    async fn run_concatenate(
        &self,
        flow: &mut Flow,
        scope: &mut WorkspaceScope,
        first: ClipRecord,
        second: ClipRecord,
    ) -> OpResult<()> {
        let a = scope.write("a.mp3", &first.data).await?;
        let b = scope.write("b.mp3", &second.data).await?;
        let list = scope
            .write(
                "list.txt",
                format!("file '{}'\nfile '{}'\n", a.display(), b.display()).as_bytes(),
            )
            .await?;
        flow.advance(Stage::InputMaterialized);

        let output = scope.create("out.mp3");
        flow.advance(Stage::Transcoding);
        self.transcoder
            .invoke(&TranscodeCommand::concat(list, output.clone()))
            .await?;

        let joined = tokio::fs::read(&output).await?;
        flow.advance(Stage::OutputRead);

        self.store.replace(first.id, joined).await?;
        flow.advance(Stage::Persisted);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Synthesize
    // ------------------------------------------------------------------

    /// Text to speech. The result is returned directly rather than stored;
    /// the remote provider already delivers the target container, the local
    /// engine's WAV is re-encoded through the invoker.
    pub async fn synthesize(&self, text: &str, language: &str, rate: f64) -> OpResult<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(OpError::Validation("text must not be empty".to_string()));
        }
        if !rate.is_finite() || !(0.1..=10.0).contains(&rate) {
            return Err(OpError::Validation(
                "rate must be between 0.1 and 10".to_string(),
            ));
        }

        let mut flow = Flow::start("synthesize");
        let mut scope = self.workspace.scope(flow.op_id).await?;
        let result = self
            .run_synthesize(&mut flow, &mut scope, text, language, rate)
            .await;
        scope.release().await;
        self.finish(&flow, result)
    }

    async fn run_synthesize(
        &self,
        flow: &mut Flow,
        scope: &mut WorkspaceScope,
        text: &str,
        language: &str,
        rate: f64,
    ) -> OpResult<Vec<u8>> {
        let mp3 = scope.create("tts.mp3");

        match self.synthesizer.route(language) {
            SynthesisRoute::Remote => {
                flow.advance(Stage::Transcoding);
                self.synthesizer
                    .synthesize_remote(text, language, rate, &mp3)
                    .await?;
            }
            SynthesisRoute::Local { voice } => {
                let wav = scope.create("tts.wav");
                self.synthesizer
                    .synthesize_to_wav(text, &voice, rate, &wav)
                    .await?;
                flow.advance(Stage::InputMaterialized);

                flow.advance(Stage::Transcoding);
                self.transcoder
                    .invoke(&TranscodeCommand::encode_mp3(wav, mp3.clone()))
                    .await?;
            }
        }

        let bytes = tokio::fs::read(&mp3).await?;
        flow.advance(Stage::OutputRead);
        Ok(bytes)
    }

    // ------------------------------------------------------------------
    // Clone (collaborator-backed)
    // ------------------------------------------------------------------

    /// Send an owned clip to the cloning service and store the result as a
    /// new artifact for the same owner
    pub async fn clone_voice(
        &self,
        identity: Uuid,
        id: Uuid,
        target_voice: &str,
    ) -> OpResult<Uuid> {
        let client = self
            .clone_client
            .as_ref()
            .ok_or_else(|| OpError::Provider("voice cloning not configured".to_string()))?;

        let clip = self.fetch_owned(identity, id).await?;
        let cloned = client.clone_voice(clip.data, target_voice).await?;

        let record = ClipRecord::new(
            identity,
            format!("{}_{}.mp3", target_voice, clip.filename.trim_end_matches(".mp3")),
            "audio/mpeg".to_string(),
            cloned,
        );
        let new_id = self.store.put(record).await?;
        info!(source = %id, clone = %new_id, "Stored cloned clip");
        Ok(new_id)
    }

    /// Readiness of the cloning collaborator
    pub async fn clone_service_health(&self) -> OpResult<crate::services::CloneServiceHealth> {
        let client = self
            .clone_client
            .as_ref()
            .ok_or_else(|| OpError::Provider("voice cloning not configured".to_string()))?;
        client.health().await
    }

    // ------------------------------------------------------------------
    // Owner-checked CRUD
    // ------------------------------------------------------------------

    pub async fn download(&self, identity: Uuid, id: Uuid) -> OpResult<ClipRecord> {
        self.fetch_owned(identity, id).await
    }

    pub async fn rename(&self, identity: Uuid, id: Uuid, filename: &str) -> OpResult<()> {
        if filename.trim().is_empty() {
            return Err(OpError::Validation("filename must not be empty".to_string()));
        }
        self.fetch_owned(identity, id).await?;
        self.store.rename(id, filename).await
    }

    pub async fn delete(&self, identity: Uuid, id: Uuid) -> OpResult<()> {
        self.fetch_owned(identity, id).await?;
        self.store.delete(id).await
    }

    pub async fn list(&self, identity: Uuid) -> OpResult<Vec<crate::db::ClipSummary>> {
        self.store.list(identity).await
    }

    fn finish<T>(&self, flow: &Flow, result: OpResult<T>) -> OpResult<T> {
        match &result {
            Ok(_) => {
                debug!(op = flow.op, op_id = %flow.op_id, stage = ?Stage::Complete, "Flow complete");
            }
            Err(err) => {
                warn!(
                    op = flow.op,
                    op_id = %flow.op_id,
                    failed_at = ?flow.stage,
                    error = %err,
                    "Flow failed"
                );
            }
        }
        result
    }
}

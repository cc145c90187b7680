//! Service modules for the audio operation pipeline

pub mod clone_client;
pub mod pipeline;
pub mod transcoder;
pub mod tts;
pub mod workspace;

pub use clone_client::{CloneServiceHealth, VoiceCloneClient};
pub use pipeline::{AudioPipeline, TrimOutcome};
pub use transcoder::{FfmpegInvoker, Transcode, TranscodeCommand};
pub use tts::{SpeechSynthesizer, SynthesisRoute};
pub use workspace::{TempWorkspace, WorkspaceScope};

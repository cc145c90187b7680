//! ffmpeg invocation
//!
//! [`TranscodeCommand`] describes one engine run (argument mapping for each
//! pipeline flow); [`Transcode`] is the seam the pipeline calls through, so
//! flow tests can substitute a fake engine. The real [`FfmpegInvoker`] spawns
//! ffmpeg, bounds the wait, and verifies the declared output actually exists
//! before letting callers read it.

use crate::error::{OpError, OpResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

/// Fixed target profile for every re-encode
pub const TARGET_BITRATE: &str = "128k";
pub const TARGET_SAMPLE_RATE: &str = "44100";
pub const TARGET_CHANNELS: &str = "2";
const TARGET_CODEC: &str = "libmp3lame";

/// Recording-latency artifact stripped from every ingested clip, in seconds.
/// Policy constant, not user-configurable.
pub const LEAD_TRIM_SECS: f64 = 1.1;

/// Loudness factor from a percent parameter; values below 1 are clamped up,
/// an omitted percent means 100 (factor 1.0, no change)
pub fn gain_factor(gain_percent: Option<u32>) -> f64 {
    f64::from(gain_percent.unwrap_or(100).max(1)) / 100.0
}

/// One engine invocation: args before `-i`, the single input, args after it,
/// and the declared output path (scope-owned, unique per invocation)
#[derive(Debug, Clone)]
pub struct TranscodeCommand {
    pre_input: Vec<String>,
    input: PathBuf,
    post_input: Vec<String>,
    output: PathBuf,
}

impl TranscodeCommand {
    /// Ingest transcode: fixed mp3 profile plus the unconditional lead trim
    /// (input-side seek, so the engine skips the artifact before decoding)
    pub fn ingest(input: PathBuf, output: PathBuf) -> Self {
        Self {
            pre_input: vec!["-ss".into(), format!("{}", LEAD_TRIM_SECS)],
            input,
            post_input: vec![
                "-c:a".into(),
                TARGET_CODEC.into(),
                "-b:a".into(),
                TARGET_BITRATE.into(),
                "-ar".into(),
                TARGET_SAMPLE_RATE.into(),
                "-ac".into(),
                TARGET_CHANNELS.into(),
            ],
            output,
        }
    }

    /// Trim: seek to `start`, keep `end - start` seconds, apply the volume
    /// filter, re-encode only the audio stream
    pub fn trim(input: PathBuf, output: PathBuf, start: f64, end: f64, gain_percent: Option<u32>) -> Self {
        Self {
            pre_input: Vec::new(),
            input,
            post_input: vec![
                "-ss".into(),
                format!("{}", start),
                "-t".into(),
                format!("{}", end - start),
                "-af".into(),
                format!("volume={}", gain_factor(gain_percent)),
                "-c:a".into(),
                TARGET_CODEC.into(),
            ],
            output,
        }
    }

    /// Concatenate via the list-based demuxer with stream copy (no
    /// re-encode). `list_file` holds one `file '<path>'` line per source;
    /// the mechanism takes any number of entries.
    pub fn concat(list_file: PathBuf, output: PathBuf) -> Self {
        Self {
            pre_input: vec!["-f".into(), "concat".into(), "-safe".into(), "0".into()],
            input: list_file,
            post_input: vec!["-c".into(), "copy".into()],
            output,
        }
    }

    /// Re-encode a WAV (offline synthesis output) to the fixed mp3 profile
    pub fn encode_mp3(input: PathBuf, output: PathBuf) -> Self {
        Self {
            pre_input: Vec::new(),
            input,
            post_input: vec![
                "-c:a".into(),
                TARGET_CODEC.into(),
                "-b:a".into(),
                TARGET_BITRATE.into(),
                "-ar".into(),
                TARGET_SAMPLE_RATE.into(),
                "-ac".into(),
                TARGET_CHANNELS.into(),
            ],
            output,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Render the full argv (excluding the program name)
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
        args.extend(self.pre_input.iter().cloned());
        args.push("-i".into());
        args.push(self.input.display().to_string());
        args.extend(self.post_input.iter().cloned());
        args.push("-y".into());
        args.push(self.output.display().to_string());
        args
    }
}

/// Engine invocation seam
#[async_trait]
pub trait Transcode: Send + Sync {
    /// Run the engine to completion. Resolves only when the declared output
    /// file exists; callers may read it afterwards.
    async fn invoke(&self, command: &TranscodeCommand) -> OpResult<()>;
}

/// Real engine: spawns ffmpeg as a child process
pub struct FfmpegInvoker {
    ffmpeg_path: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegInvoker {
    pub fn new(ffmpeg_path: PathBuf, timeout: Option<Duration>) -> Self {
        Self {
            ffmpeg_path,
            timeout,
        }
    }
}

#[async_trait]
impl Transcode for FfmpegInvoker {
    async fn invoke(&self, command: &TranscodeCommand) -> OpResult<()> {
        let args = command.to_args();
        info!(
            engine = %self.ffmpeg_path.display(),
            output = %command.output().display(),
            "Transcode started"
        );
        debug!(args = ?args, "Engine arguments");

        let child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| OpError::Transcode {
                exit: None,
                stderr: format!("failed to spawn {}: {}", self.ffmpeg_path.display(), err),
            })?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result?,
                // dropping the wait future kills the child (kill_on_drop)
                Err(_) => {
                    return Err(OpError::Transcode {
                        exit: None,
                        stderr: format!("engine timed out after {:?}", limit),
                    })
                }
            },
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            return Err(OpError::Transcode {
                exit: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        // Zero exit without the declared output is an engine contract
        // violation, reported distinctly rather than tolerated
        if fs::metadata(command.output()).await.is_err() {
            return Err(OpError::MissingOutput(command.output().to_path_buf()));
        }

        debug!(output = %command.output().display(), "Transcode complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_factor_defaults_to_unity() {
        assert_eq!(gain_factor(None), 1.0);
        assert_eq!(gain_factor(Some(100)), 1.0);
    }

    #[test]
    fn gain_factor_scales_and_clamps() {
        assert_eq!(gain_factor(Some(150)), 1.5);
        assert_eq!(gain_factor(Some(50)), 0.5);
        // zero is clamped up to 1 percent, never silence-by-accident
        assert_eq!(gain_factor(Some(0)), 0.01);
    }

    #[test]
    fn ingest_args_carry_lead_trim_and_profile() {
        let cmd = TranscodeCommand::ingest(PathBuf::from("/t/in.mp3"), PathBuf::from("/t/out.mp3"));
        let args = cmd.to_args();

        let seek = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[seek + 1], "1.1");
        // lead trim is input-side: -ss precedes -i
        assert!(seek < args.iter().position(|a| a == "-i").unwrap());

        for expected in ["libmp3lame", "128k", "44100"] {
            assert!(args.iter().any(|a| a == expected), "missing {}", expected);
        }
        assert_eq!(args.last().unwrap(), "/t/out.mp3");
    }

    #[test]
    fn trim_args_map_start_duration_and_gain() {
        let cmd = TranscodeCommand::trim(
            PathBuf::from("/t/in.mp3"),
            PathBuf::from("/t/out.mp3"),
            2.0,
            5.0,
            Some(150),
        );
        let args = cmd.to_args();

        let seek = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[seek + 1], "2");
        let dur = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[dur + 1], "3");
        let filter = args.iter().position(|a| a == "-af").unwrap();
        assert_eq!(args[filter + 1], "volume=1.5");
    }

    #[test]
    fn concat_args_use_demuxer_with_stream_copy() {
        let cmd = TranscodeCommand::concat(PathBuf::from("/t/list.txt"), PathBuf::from("/t/out.mp3"));
        let args = cmd.to_args();

        let fmt = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[fmt + 1], "concat");
        let codec = args.iter().position(|a| a == "-c").unwrap();
        assert_eq!(args[codec + 1], "copy");
        assert!(!args.iter().any(|a| a == "libmp3lame"));
    }

    #[tokio::test]
    async fn unspawnable_engine_is_a_transcode_error() {
        let invoker = FfmpegInvoker::new(PathBuf::from("/nonexistent/ffmpeg-missing"), None);
        let cmd = TranscodeCommand::ingest(PathBuf::from("/t/in.mp3"), PathBuf::from("/t/out.mp3"));

        let err = invoker.invoke(&cmd).await.unwrap_err();
        assert!(matches!(err, OpError::Transcode { exit: None, .. }));
    }

    #[tokio::test]
    async fn zero_exit_without_output_is_missing_output() {
        // `true` exits 0 and writes nothing, violating the engine contract
        let invoker = FfmpegInvoker::new(PathBuf::from("/bin/true"), None);
        let cmd = TranscodeCommand::ingest(
            PathBuf::from("/t/in.mp3"),
            std::env::temp_dir().join(format!("{}_never_written.mp3", uuid::Uuid::new_v4())),
        );

        let err = invoker.invoke(&cmd).await.unwrap_err();
        assert!(matches!(err, OpError::MissingOutput(_)));
    }

    #[tokio::test]
    async fn nonzero_exit_carries_diagnostics() {
        let invoker = FfmpegInvoker::new(PathBuf::from("/bin/false"), None);
        let cmd = TranscodeCommand::ingest(PathBuf::from("/t/in.mp3"), PathBuf::from("/t/out.mp3"));

        let err = invoker.invoke(&cmd).await.unwrap_err();
        match err {
            OpError::Transcode { exit, .. } => assert_eq!(exit, Some(1)),
            other => panic!("expected Transcode, got {:?}", other),
        }
    }
}

//! Configuration for the encoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::types::AudioConstraints;

/// Configuration for the FFmpeg-based encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Timeout for a single encode or merge in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Fade-out applied to the end of each split part, in seconds. 0 disables it.
    #[serde(default = "default_fade_out")]
    pub fade_out_secs: f64,

    /// Output audio format and quality.
    #[serde(default)]
    pub audio: AudioConstraints,

    /// Additional global ffmpeg arguments.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_timeout() -> u64 {
    3600 // 1 hour
}

fn default_log_level() -> String {
    "warning".to_string()
}

fn default_fade_out() -> f64 {
    1.0
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_timeout(),
            ffmpeg_log_level: default_log_level(),
            fade_out_secs: default_fade_out(),
            audio: AudioConstraints::default(),
            extra_ffmpeg_args: Vec::new(),
        }
    }
}

impl EncoderConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the output audio constraints.
    pub fn with_audio(mut self, audio: AudioConstraints) -> Self {
        self.audio = audio;
        self
    }

    /// Sets the split-part fade-out in seconds.
    pub fn with_fade_out(mut self, secs: f64) -> Self {
        self.fade_out_secs = secs;
        self
    }

    /// Fade-out as a duration, `None` when disabled.
    pub fn fade_out(&self) -> Option<Duration> {
        if self.fade_out_secs.is_finite() && self.fade_out_secs > 0.0 {
            Some(Duration::from_secs_f64(self.fade_out_secs))
        } else {
            None
        }
    }
}

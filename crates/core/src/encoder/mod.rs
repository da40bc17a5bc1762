//! Encoder module for transcoding, trimming and concatenating audio.
//!
//! This module provides the `MediaEncoder` trait and an FFmpeg-backed
//! implementation.
//!
//! # Features
//!
//! - Audio transcoding (MP3, AAC, Vorbis, Opus, FLAC, WAV)
//! - Time-range extraction for chapter splitting
//! - Fade-out at the end of a part
//! - Concatenation of several inputs into one output
//! - Metadata embedding
//! - Progress reporting during encoding
//!
//! # Example
//!
//! ```ignore
//! use audiodrop_core::encoder::{EncodeJob, EncoderConfig, FfmpegEncoder, MediaEncoder, TimeRange};
//! use audiodrop_core::progress::NoProgress;
//!
//! let encoder = FfmpegEncoder::new(EncoderConfig::default());
//! encoder.validate().await?;
//!
//! let info = encoder.probe(Path::new("/tmp/raw.webm")).await?;
//! println!("Duration: {} seconds", info.duration_secs);
//!
//! let mut job = EncodeJob::new("job-1", "/tmp/raw.webm", "/music/part.mp3", Default::default());
//! job.range = Some(TimeRange::new(60_000, Some(125_000)));
//! let result = encoder.convert(job, &NoProgress).await?;
//! println!("Encoded in {} ms", result.duration_ms);
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::EncoderConfig;
pub use error::EncoderError;
pub use ffmpeg::FfmpegEncoder;
pub use traits::MediaEncoder;
pub use types::{
    AudioConstraints, AudioFormat, EmbeddedMetadata, EncodeJob, EncodeResult, MediaInfo,
    MergeJob, TimeRange,
};

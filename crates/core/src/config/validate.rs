use super::{types::Config, ConfigError};
use crate::encoder::AudioFormat;

/// Validate configuration
/// Currently validates:
/// - Tool paths and the format selector are not empty
/// - Timeouts are not 0
/// - Fade-out is a finite, non-negative number of seconds
/// - MP3 VBR quality is within 0-9
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.source.ytdlp_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "source.ytdlp_path cannot be empty".to_string(),
        ));
    }
    if config.source.format_selector.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "source.format_selector cannot be empty".to_string(),
        ));
    }
    if config.source.metadata_timeout_secs == 0 || config.source.download_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "source timeouts cannot be 0".to_string(),
        ));
    }

    if config.encoder.ffmpeg_path.as_os_str().is_empty()
        || config.encoder.ffprobe_path.as_os_str().is_empty()
    {
        return Err(ConfigError::ValidationError(
            "encoder.ffmpeg_path and encoder.ffprobe_path cannot be empty".to_string(),
        ));
    }
    if config.encoder.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "encoder.timeout_secs cannot be 0".to_string(),
        ));
    }
    let fade = config.encoder.fade_out_secs;
    if !fade.is_finite() || fade < 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "encoder.fade_out_secs must be a non-negative number, got {}",
            fade
        )));
    }
    if config.encoder.audio.format == AudioFormat::Mp3 {
        if let Some(quality) = config.encoder.audio.quality.filter(|q| *q > 9) {
            return Err(ConfigError::ValidationError(format!(
                "encoder.audio.quality must be 0-9 for mp3, got {}",
                quality
            )));
        }
    }

    Ok(())
}

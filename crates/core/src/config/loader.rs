use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// Nested keys are separated by a double underscore, e.g.
/// `AUDIODROP_ENCODER__FFMPEG_PATH=/opt/ffmpeg`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    figment_for(Figment::new().merge(Toml::file(path)))
}

/// Load configuration from defaults and environment only.
pub fn load_default_config() -> Result<Config, ConfigError> {
    figment_for(Figment::new())
}

fn figment_for(files: Figment) -> Result<Config, ConfigError> {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(files)
        .merge(Env::prefixed("AUDIODROP_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::AudioFormat;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
output_dir = "/music"

[encoder.audio]
format = "opus"
bitrate_kbps = 160

[orchestrator]
max_concurrent_items = 2
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/music"));
        assert_eq!(config.encoder.audio.format, AudioFormat::Opus);
        assert_eq!(config.orchestrator.max_concurrent_items, 2);
        assert_eq!(config.source.format_selector, "bestaudio/best");
    }

    #[test]
    fn test_load_config_from_str_empty_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.orchestrator.max_concurrent_items, 4);
        assert_eq!(config.encoder.audio.format, AudioFormat::Mp3);
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[orchestrator]
max_concurrent_items = "many"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[source]
ytdlp_path = "/opt/yt-dlp"

[pipeline]
temp_dir = "/var/tmp/audiodrop"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.source.ytdlp_path, PathBuf::from("/opt/yt-dlp"));
        assert_eq!(config.pipeline.temp_dir, PathBuf::from("/var/tmp/audiodrop"));
        assert_eq!(config.encoder.timeout_secs, 3600);
    }
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] json5::Error),
    #[error("Config directory not found")]
    ConfigDirNotFound,
}

/// Global configuration read from `config.json5` (or `config.json`) in the
/// config directory.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    /// Transcoding settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcoding: Option<TranscodingConfig>,

    /// Logging configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TranscodingConfig {
    /// Location of the ffmpeg binary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<String>,
    /// Output format used when a stream request names none (`mp3`, `opus`, `vorbis`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_output_format: Option<String>,
    /// Bitrate in bits per second used with `default_output_format`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_output_bitrate: Option<u32>,
    /// Transcode stream requests that do not ask for a format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_by_default: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Get the path to a config file, preferring .json5 but also checking .json
fn get_config_file_path(dir: &Path, filename: &str) -> Option<PathBuf> {
    let json5_path = dir.join(format!("{filename}.json5"));
    if json5_path.exists() {
        return Some(json5_path);
    }

    let json_path = dir.join(format!("{filename}.json"));
    if json_path.exists() {
        return Some(json_path);
    }

    None
}

/// Parses a global configuration document.
///
/// # Errors
///
/// * If the content is not valid json5 or does not match the config shape
pub fn parse_global_config(content: &str) -> Result<GlobalConfig, ConfigError> {
    Ok(json5::from_str(content)?)
}

/// Load global configuration from the given directory
///
/// Returns the default configuration when no config file exists.
///
/// # Errors
///
/// * If the config file cannot be read
/// * If the config file is malformed
pub fn load_global_config_from_dir(dir: &Path) -> Result<GlobalConfig, ConfigError> {
    let Some(path) = get_config_file_path(dir, "config") else {
        log::debug!("No config file found in {}", dir.display());
        return Ok(GlobalConfig::default());
    };

    log::debug!("Loading config file {}", path.display());

    parse_global_config(&fs::read_to_string(path)?)
}

/// Load global configuration from the config directory
///
/// # Errors
///
/// * If the config directory cannot be found
/// * If the config file cannot be read
/// * If the config file is malformed
pub fn load_global_config() -> Result<GlobalConfig, ConfigError> {
    let config_dir = crate::get_config_dir_path().ok_or(ConfigError::ConfigDirNotFound)?;

    load_global_config_from_dir(&config_dir)
}

impl GlobalConfig {
    /// The ffmpeg binary location: the config value if present, else the
    /// environment override, else `/usr/bin/ffmpeg`.
    #[must_use]
    pub fn ffmpeg_path(&self) -> PathBuf {
        self.transcoding
            .as_ref()
            .and_then(|x| x.ffmpeg_path.as_deref())
            .filter(|x| !x.is_empty())
            .map_or_else(crate::default_ffmpeg_path, PathBuf::from)
    }
}

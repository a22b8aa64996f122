#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

#[cfg(feature = "file")]
pub mod file;

/// Location of the ffmpeg binary when neither the config file nor the
/// environment names one.
pub const DEFAULT_FFMPEG_PATH: &str = "/usr/bin/ffmpeg";

/// Environment variable that overrides the ffmpeg binary location.
pub const FFMPEG_PATH_ENV: &str = "TONEARM_FFMPEG_PATH";

static ROOT_DIR: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Sets the root directory for Tonearm configuration.
///
/// By default, the root directory is `~/.local/tonearm`. This function allows
/// overriding that default location.
///
/// # Panics
///
/// * If the `ROOT_DIR` `Mutex` is poisoned
pub fn set_root_dir(path: PathBuf) {
    *ROOT_DIR.lock().unwrap() = Some(path);
}

#[must_use]
fn get_root_dir() -> Option<PathBuf> {
    let mut root_dir = ROOT_DIR.lock().unwrap();

    if root_dir.is_some() {
        return root_dir.clone();
    }

    *root_dir = home::home_dir().map(|home| home.join(".local").join("tonearm"));

    root_dir.clone()
}

/// Returns the path to the Tonearm configuration directory.
///
/// Defaults to `~/.local/tonearm` unless overridden with [`set_root_dir`].
#[must_use]
pub fn get_config_dir_path() -> Option<PathBuf> {
    get_root_dir()
}

/// Returns the path to the logs directory.
#[must_use]
pub fn get_logs_dir_path() -> Option<PathBuf> {
    get_config_dir_path().map(|config| config.join("logs"))
}

fn make_dir_path(path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = path
        && (path.is_dir() || std::fs::create_dir_all(&path).is_ok())
    {
        return Some(path);
    }

    None
}

/// Returns the path to the logs directory, creating it if it doesn't exist.
///
/// Returns `None` if the directory cannot be created or the path cannot be determined.
#[must_use]
pub fn make_logs_dir_path() -> Option<PathBuf> {
    make_dir_path(get_logs_dir_path())
}

/// Resolves the ffmpeg binary location from the environment, falling back to
/// [`DEFAULT_FFMPEG_PATH`].
#[must_use]
pub fn default_ffmpeg_path() -> PathBuf {
    std::env::var_os(FFMPEG_PATH_ENV)
        .filter(|x| !x.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_FFMPEG_PATH), PathBuf::from)
}

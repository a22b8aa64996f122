#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::fs::OpenOptions;

pub use log;
use thiserror::Error;
use tonearm_config::{file::LoggingConfig, make_logs_dir_path};

#[cfg(debug_assertions)]
const DEFAULT_LOG_LEVEL: &str = "tonearm=trace";
#[cfg(not(debug_assertions))]
const DEFAULT_LOG_LEVEL: &str = "tonearm=info";

#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    SetLogger(#[from] log::SetLoggerError),
}

/// Resolves the log filter directives: `TONEARM_LOG`, then `RUST_LOG`, then
/// the configured `logging.level`, then the build's default level.
#[must_use]
pub fn log_filter(config: Option<&LoggingConfig>) -> String {
    filter_from(
        std::env::var("TONEARM_LOG").ok(),
        std::env::var("RUST_LOG").ok(),
        config.and_then(|x| x.level.clone()),
    )
}

fn filter_from(
    tonearm_log: Option<String>,
    rust_log: Option<String>,
    config_level: Option<String>,
) -> String {
    [tonearm_log, rust_log, config_level]
        .into_iter()
        .flatten()
        .find(|x| !x.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

fn log_filename<'a>(
    filename: Option<&'a str>,
    config: Option<&'a LoggingConfig>,
) -> Option<&'a str> {
    config
        .and_then(|x| x.file.as_deref())
        .filter(|x| !x.trim().is_empty())
        .or(filename)
}

/// Installs the global logger.
///
/// Log lines are appended to `<config dir>/logs/<file>` instead of stderr when
/// a file is named, either by the configured `logging.file` or, failing that,
/// by `filename`.
///
/// # Errors
///
/// * If the log file cannot be opened
/// * If a global logger has already been installed
pub fn init(filename: Option<&str>, config: Option<&LoggingConfig>) -> Result<(), InitError> {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&log_filter(config));

    if let Some(filename) = log_filename(filename, config) {
        if let Some(log_dir) = make_logs_dir_path() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_dir.join(filename))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        } else {
            eprintln!("Could not get config dir to put the logs into");
        }
    }

    builder.try_init()?;

    Ok(())
}

#[cfg(feature = "macros")]
#[macro_export]
macro_rules! debug_or_trace {
    (($($debug:tt)+), ($($trace:tt)+)) => {
        if $crate::log::log_enabled!($crate::log::Level::Trace) {
            $crate::log::trace!($($trace)*);
        } else {
            $crate::log::debug!($($debug)*);
        }
    }
}

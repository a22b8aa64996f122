//! Transcode decision and transcoding command-line tool.
//!
//! # Usage
//!
//! Decide how a client should receive a file:
//! ```text
//! tonearm-transcode decide --client client.json --source source.json
//! ```
//!
//! Transcode a file with ffmpeg:
//! ```text
//! tonearm-transcode transcode input.flac --source source.json --output out.opus --format opus --bitrate 128000
//! ```
//!
//! `client.json` is a client info document as sent by clients;
//! `source.json` holds the source's audio properties.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Parser, Subcommand};
use thiserror::Error;
use tonearm_config::file::{GlobalConfig, load_global_config};
use tonearm_media::{AudioProperties, TranscodeOutputFormat, TranscodeParameters};
use tonearm_transcode_decision::{
    AudioFileId, AudioFileInfo, get_transcode_decision_tracker, handle_transcode_decision,
    parse_client_info_from_json,
};
use tonearm_transcoding::{
    TranscodeService, into_byte_stream, resource::ResourceHandler, save_bytes_stream_to_file,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prints the transcode decision for a client and a source as JSON.
    Decide {
        /// Client info JSON file.
        #[arg(long)]
        client: PathBuf,

        /// Source audio properties JSON file.
        #[arg(long)]
        source: PathBuf,
    },
    /// Transcodes a file with ffmpeg.
    Transcode {
        #[arg(index = 1)]
        file: PathBuf,

        /// Source audio properties JSON file.
        #[arg(long)]
        source: PathBuf,

        /// Output file. Without an extension, the output format's canonical
        /// extension is added.
        #[arg(short, long)]
        output: PathBuf,

        /// `mp3`, `opus`, `vorbis` or `flac`. Inferred from the output
        /// extension when omitted.
        #[arg(short, long)]
        format: Option<String>,

        /// Bits per second.
        #[arg(short, long)]
        bitrate: Option<u32>,

        #[arg(long, default_value_t = 0)]
        offset_ms: u64,

        #[arg(long, default_value_t = false)]
        strip_metadata: bool,

        /// Overrides the configured ffmpeg binary.
        #[arg(long)]
        ffmpeg: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid audio properties in {path}: {source}")]
    Source {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Cannot determine output format for '{0}'")]
    OutputFormat(String),
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_audio_properties(path: &Path) -> Result<AudioProperties, CliError> {
    serde_json::from_str(&read_file(path)?).map_err(|source| CliError::Source {
        path: path.to_path_buf(),
        source,
    })
}

fn output_format(
    format: Option<&str>,
    output: &Path,
) -> Result<TranscodeOutputFormat, CliError> {
    let name = format
        .map(ToString::to_string)
        .or_else(|| {
            output
                .extension()
                .and_then(|x| x.to_str())
                .map(|x| if x.eq_ignore_ascii_case("ogg") { "vorbis" } else { x }.to_string())
        })
        .unwrap_or_default();

    TranscodeOutputFormat::from_format_name(&name).ok_or(CliError::OutputFormat(name))
}

fn output_path(output: PathBuf, format: TranscodeOutputFormat) -> PathBuf {
    if output.extension().is_some() {
        return output;
    }

    output.with_extension(format.container().file_extension())
}

fn decide(client: &Path, source: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let client_info = parse_client_info_from_json(&read_file(client)?)?;
    let audio_properties = read_audio_properties(source)?;

    let response = handle_transcode_decision(
        get_transcode_decision_tracker(),
        AudioFileId::Track(0),
        &client_info,
        &AudioFileInfo {
            path: source.to_path_buf(),
            audio_properties,
        },
    );

    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn transcode(
    config: &GlobalConfig,
    file: PathBuf,
    source: &Path,
    output: PathBuf,
    format: Option<String>,
    bitrate: Option<u32>,
    offset_ms: u64,
    strip_metadata: bool,
    ffmpeg: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let audio_properties = read_audio_properties(source)?;
    let format = output_format(format.as_deref(), &output)?;
    let output = output_path(output, format);

    let service = TranscodeService::new(ffmpeg.unwrap_or_else(|| config.ffmpeg_path()))?;

    let params = TranscodeParameters::builder(file, audio_properties)
        .offset(Duration::from_millis(offset_ms))
        .format(format)
        .bitrate(bitrate)
        .strip_metadata(strip_metadata)
        .build()?;

    tonearm_logging::debug_or_trace!(
        ("Transcoding to {format} ({})", output.display()),
        ("Transcoding to {format} ({}) with {params:?}", output.display())
    );

    let handler = service.create_transcode_resource_handler(params, true)?;
    if let Some(estimate) = handler.content_length() {
        log::info!("Estimated output size: {estimate} bytes");
    }

    let written = save_bytes_stream_to_file(into_byte_stream(Box::new(handler)), &output).await?;

    log::info!("Wrote {written} bytes to {}", output.display());

    Ok(())
}

/// # Errors
///
/// * If an input file cannot be read or parsed
/// * If the ffmpeg binary cannot be found
/// * If the transcode fails
///
/// # Panics
///
/// * If the logging system fails to initialize
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_global_config().unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        GlobalConfig::default()
    });

    tonearm_logging::init(Some("tonearm_transcode.log"), config.logging.as_ref())
        .expect("Failed to initialize logging");

    match Args::parse().command {
        Commands::Decide { client, source } => decide(&client, &source),
        Commands::Transcode {
            file,
            source,
            output,
            format,
            bitrate,
            offset_ms,
            strip_metadata,
            ffmpeg,
        } => {
            transcode(
                &config,
                file,
                &source,
                output,
                format,
                bitrate,
                offset_ms,
                strip_metadata,
                ffmpeg,
            )
            .await
        }
    }
}

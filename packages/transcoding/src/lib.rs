//! Runs ffmpeg transcodes and serves their output, or plain files, as byte
//! streams.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::{path::Path, pin::Pin};

use bytes::Bytes;
use futures::{Stream, StreamExt as _};
use thiserror::Error;
use tokio::{
    io::{AsyncWriteExt as _, BufWriter},
    pin,
};

pub mod range;
pub mod resource;
pub mod service;
pub mod transcoder;

pub use resource::{
    FileResourceHandler, ResourceError, ResourceHandler, TranscodeResourceHandler,
    into_byte_stream,
};
pub use service::{TranscodeService, TranscodeServiceError, estimate_content_length};
pub use transcoder::{TranscodeError, Transcoder, TranscoderState};

pub type BytesStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

#[derive(Debug, Error)]
pub enum SaveBytesStreamToFileError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("IO Error after read {bytes_read} bytes: {source:?}")]
    Read {
        bytes_read: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("IO Error after reading {bytes_read} bytes: {source:?}")]
    Write {
        bytes_read: u64,
        #[source]
        source: std::io::Error,
    },
}

/// Writes a byte stream to `path`, creating parent directories and
/// truncating an existing file. Returns the number of bytes written.
///
/// # Errors
///
/// * If the file or its parent directory cannot be created
/// * If the stream yields an error
/// * If writing to the file fails
pub async fn save_bytes_stream_to_file<S: Stream<Item = Result<Bytes, std::io::Error>>>(
    stream: S,
    path: &Path,
) -> Result<u64, SaveBytesStreamToFileError> {
    if let Some(parent) = path.parent().filter(|x| !x.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);

    pin!(stream);

    let mut read = 0_u64;

    while let Some(bytes) = stream.next().await {
        let bytes = bytes.map_err(|source| SaveBytesStreamToFileError::Read {
            bytes_read: read,
            source,
        })?;

        read += bytes.len() as u64;

        log::trace!("Writing bytes to {}: {} ({read} total)", path.display(), bytes.len());

        writer
            .write_all(&bytes)
            .await
            .map_err(|source| SaveBytesStreamToFileError::Write {
                bytes_read: read,
                source,
            })?;
    }

    writer.flush().await?;

    log::debug!("Wrote {read} bytes to {}", path.display());

    Ok(read)
}

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;
use tonearm_config::file::GlobalConfig;
use tonearm_media::TranscodeParameters;

use crate::{
    range::Range,
    resource::{FileResourceHandler, ResourceError, TranscodeResourceHandler},
    transcoder::{TranscodeError, Transcoder},
};

#[derive(Debug, Error)]
pub enum TranscodeServiceError {
    #[error("ffmpeg binary not found at {0}")]
    BinaryNotFound(PathBuf),
}

/// Estimated size in bytes of `duration` of audio at `bitrate` bits per second.
#[must_use]
pub fn estimate_content_length(bitrate: u32, duration: Duration) -> u64 {
    let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);

    (u64::from(bitrate) / 8).saturating_mul(duration_ms) / 1000
}

#[derive(Debug, Clone)]
pub struct TranscodeService {
    ffmpeg_path: PathBuf,
}

impl TranscodeService {
    /// # Errors
    ///
    /// * If `ffmpeg_path` is not an existing file
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Result<Self, TranscodeServiceError> {
        let ffmpeg_path = ffmpeg_path.into();

        if !ffmpeg_path.is_file() {
            log::error!("ffmpeg binary not found at {}", ffmpeg_path.display());
            return Err(TranscodeServiceError::BinaryNotFound(ffmpeg_path));
        }

        log::info!(
            "Transcode service started with ffmpeg {}",
            ffmpeg_path.display()
        );

        Ok(Self { ffmpeg_path })
    }

    /// # Errors
    ///
    /// * If the configured ffmpeg binary does not exist
    pub fn from_config(config: &GlobalConfig) -> Result<Self, TranscodeServiceError> {
        Self::new(config.ffmpeg_path())
    }

    #[must_use]
    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    /// # Errors
    ///
    /// * If the transcoder fails to start
    pub fn start_transcoder(
        &self,
        params: TranscodeParameters,
    ) -> Result<Transcoder, TranscodeError> {
        Transcoder::start(&self.ffmpeg_path, params)
    }

    /// Starts a transcoder and wraps it for serving.
    ///
    /// The content length is estimated from the output bitrate (the source's
    /// for lossless outputs) over the part of the file left after the offset.
    ///
    /// # Errors
    ///
    /// * If the transcoder fails to start
    pub fn create_transcode_resource_handler(
        &self,
        params: TranscodeParameters,
        estimate_content_length: bool,
    ) -> Result<TranscodeResourceHandler, TranscodeError> {
        let estimated_content_length = if estimate_content_length {
            estimate_transcoded_content_length(&params)
        } else {
            None
        };

        Ok(TranscodeResourceHandler::new(
            self.start_transcoder(params)?,
            estimated_content_length,
        ))
    }

    /// # Errors
    ///
    /// * If the file cannot be opened
    /// * If the range is not satisfiable
    pub async fn create_file_resource_handler(
        &self,
        path: &Path,
        mime_type: &str,
        range: Option<Range>,
    ) -> Result<FileResourceHandler, ResourceError> {
        FileResourceHandler::open(path, mime_type, range).await
    }
}

fn estimate_transcoded_content_length(params: &TranscodeParameters) -> Option<u64> {
    let input = &params.input;
    let duration = input.audio_properties.duration();

    if input.offset >= duration {
        log::warn!(
            "Offset {:?} is past the audio file duration {duration:?}: not estimating content length",
            input.offset
        );
        return None;
    }

    let bitrate = params
        .output
        .bitrate
        .unwrap_or_else(|| input.audio_properties.bitrate());

    Some(estimate_content_length(bitrate, duration - input.offset))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tonearm_media::{AudioProperties, Codec, Container, TranscodeOutputFormat};

    use super::*;

    fn params(offset: Duration, bitrate: Option<u32>) -> TranscodeParameters {
        TranscodeParameters::builder(
            "/music/a.flac",
            AudioProperties::try_new(
                Container::Flac,
                Codec::Flac,
                Duration::from_secs(200),
                800_000,
                2,
                44_100,
                Some(16),
            )
            .unwrap(),
        )
        .offset(offset)
        .format(TranscodeOutputFormat::Mp3)
        .bitrate(bitrate)
        .build()
        .unwrap()
    }

    #[test_log::test]
    fn estimates_from_bitrate_and_duration() {
        assert_eq!(
            estimate_content_length(128_000, Duration::from_secs(60)),
            960_000
        );
        assert_eq!(
            estimate_content_length(128_000, Duration::from_millis(1_500)),
            24_000
        );
        assert_eq!(estimate_content_length(128_000, Duration::ZERO), 0);
    }

    #[test_log::test]
    fn estimate_accounts_for_offset() {
        assert_eq!(
            estimate_transcoded_content_length(&params(Duration::from_secs(140), Some(128_000))),
            Some(960_000)
        );
        assert_eq!(
            estimate_transcoded_content_length(&params(Duration::from_secs(200), Some(128_000))),
            None
        );
    }

    #[test_log::test]
    fn estimate_falls_back_to_source_bitrate() {
        assert_eq!(
            estimate_transcoded_content_length(&params(Duration::from_secs(190), None)),
            Some(1_000_000)
        );
    }

    #[test_log::test]
    fn missing_binary_is_rejected() {
        assert!(matches!(
            TranscodeService::new("/does/not/exist/ffmpeg"),
            Err(TranscodeServiceError::BinaryNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test_log::test(tokio::test)]
    async fn transcode_resource_handler_carries_estimate() {
        use std::io::Write as _;

        use crate::resource::ResourceHandler as _;

        let mut input = tempfile::NamedTempFile::new().unwrap();
        input.write_all(b"fLaC").unwrap();
        let mut params = params(Duration::from_secs(140), Some(128_000));
        params.input.file_path = input.path().to_path_buf();

        let service = TranscodeService::new("/bin/echo").unwrap();
        let mut handler = service
            .create_transcode_resource_handler(params.clone(), true)
            .unwrap();

        assert_eq!(handler.content_length(), Some(960_000));
        assert_eq!(handler.mime_type(), "audio/mpeg");
        assert!(handler.read_chunk().await.unwrap().is_some());

        let handler = service
            .create_transcode_resource_handler(params, false)
            .unwrap();
        assert_eq!(handler.content_length(), None);
    }
}

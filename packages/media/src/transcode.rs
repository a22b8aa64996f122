//! Transcode parameters and their validating builder.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter, EnumString};
use thiserror::Error;

use crate::{AudioProperties, Codec, Container, mime_type};

/// Output formats the transcoder can produce.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TranscodeOutputFormat {
    Mp3,
    OggOpus,
    OggVorbis,
    Flac,
}

pub const SUPPORTED_TRANSCODE_OUTPUT_FORMATS: [TranscodeOutputFormat; 4] = [
    TranscodeOutputFormat::Mp3,
    TranscodeOutputFormat::OggVorbis,
    TranscodeOutputFormat::OggOpus,
    TranscodeOutputFormat::Flac,
];

impl TranscodeOutputFormat {
    #[must_use]
    pub const fn container(self) -> Container {
        match self {
            Self::Mp3 => Container::Mpeg,
            Self::OggOpus | Self::OggVorbis => Container::Ogg,
            Self::Flac => Container::Flac,
        }
    }

    #[must_use]
    pub const fn codec(self) -> Codec {
        match self {
            Self::Mp3 => Codec::Mp3,
            Self::OggOpus => Codec::Opus,
            Self::OggVorbis => Codec::Vorbis,
            Self::Flac => Codec::Flac,
        }
    }

    #[must_use]
    pub fn from_container_codec(container: Container, codec: Codec) -> Option<Self> {
        SUPPORTED_TRANSCODE_OUTPUT_FORMATS
            .into_iter()
            .find(|x| x.container() == container && x.codec() == codec)
    }

    /// Resolves a stream request format name (`mp3`, `opus`, `vorbis`, `flac`).
    #[must_use]
    pub fn from_format_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "mp3" => Self::Mp3,
            "opus" => Self::OggOpus,
            "vorbis" => Self::OggVorbis,
            "flac" => Self::Flac,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        mime_type(self.container(), self.codec())
    }

    #[must_use]
    pub const fn is_lossless(self) -> bool {
        self.codec().is_lossless()
    }
}

impl std::fmt::Display for TranscodeOutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeInputParameters {
    pub file_path: PathBuf,
    pub audio_properties: AudioProperties,
    /// Position in the source to start reading from
    pub offset: Duration,
}

/// Output overrides. `None` keeps the source value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeOutputParameters {
    pub format: Option<TranscodeOutputFormat>,
    /// Bits per second
    pub bitrate: Option<u32>,
    pub bits_per_sample: Option<u32>,
    pub channel_count: Option<u32>,
    pub sample_rate: Option<u32>,
    pub strip_metadata: bool,
}

impl Default for TranscodeOutputParameters {
    fn default() -> Self {
        Self {
            format: None,
            bitrate: None,
            bits_per_sample: None,
            channel_count: None,
            sample_rate: None,
            strip_metadata: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeParameters {
    pub input: TranscodeInputParameters,
    pub output: TranscodeOutputParameters,
}

impl TranscodeParameters {
    #[must_use]
    pub fn builder(
        file_path: impl Into<PathBuf>,
        audio_properties: AudioProperties,
    ) -> TranscodeParametersBuilder {
        TranscodeParametersBuilder::new(file_path, audio_properties)
    }

    /// MIME type of the produced stream: the output format's, or the source's
    /// when no output format is set.
    #[must_use]
    pub fn output_mime_type(&self) -> &'static str {
        self.output.format.map_or_else(
            || self.input.audio_properties.mime_type(),
            TranscodeOutputFormat::mime_type,
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscodeParametersError {
    #[error("Unsupported output format: container={container} codec={codec}")]
    UnsupportedOutputFormat { container: Container, codec: Codec },
    #[error("Output {field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("Output {field} ({requested}) exceeds the source value ({source_value})")]
    Upscale {
        field: &'static str,
        requested: u32,
        source_value: u32,
    },
}

#[derive(Debug, Clone)]
pub struct TranscodeParametersBuilder {
    file_path: PathBuf,
    audio_properties: AudioProperties,
    offset: Duration,
    format: Option<(Container, Codec)>,
    bitrate: Option<u32>,
    bits_per_sample: Option<u32>,
    channel_count: Option<u32>,
    sample_rate: Option<u32>,
    strip_metadata: bool,
}

impl TranscodeParametersBuilder {
    #[must_use]
    pub fn new(file_path: impl Into<PathBuf>, audio_properties: AudioProperties) -> Self {
        Self {
            file_path: file_path.into(),
            audio_properties,
            offset: Duration::ZERO,
            format: None,
            bitrate: None,
            bits_per_sample: None,
            channel_count: None,
            sample_rate: None,
            strip_metadata: true,
        }
    }

    #[must_use]
    pub const fn offset(mut self, offset: Duration) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub const fn format(mut self, format: TranscodeOutputFormat) -> Self {
        self.format = Some((format.container(), format.codec()));
        self
    }

    /// Requests an arbitrary container/codec pair, validated on
    /// [`build`](Self::build).
    #[must_use]
    pub const fn container_codec(mut self, container: Container, codec: Codec) -> Self {
        self.format = Some((container, codec));
        self
    }

    #[must_use]
    pub const fn bitrate(mut self, bitrate: Option<u32>) -> Self {
        self.bitrate = bitrate;
        self
    }

    #[must_use]
    pub const fn bits_per_sample(mut self, bits_per_sample: Option<u32>) -> Self {
        self.bits_per_sample = bits_per_sample;
        self
    }

    #[must_use]
    pub const fn channel_count(mut self, channel_count: Option<u32>) -> Self {
        self.channel_count = channel_count;
        self
    }

    #[must_use]
    pub const fn sample_rate(mut self, sample_rate: Option<u32>) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    #[must_use]
    pub const fn strip_metadata(mut self, strip_metadata: bool) -> Self {
        self.strip_metadata = strip_metadata;
        self
    }

    /// # Errors
    ///
    /// * If the requested container/codec pair is not a supported output format
    /// * If a numeric override is zero
    /// * If the channel count, sample rate or bit depth exceeds the source value
    pub fn build(self) -> Result<TranscodeParameters, TranscodeParametersError> {
        let format = self
            .format
            .map(|(container, codec)| {
                TranscodeOutputFormat::from_container_codec(container, codec)
                    .ok_or(TranscodeParametersError::UnsupportedOutputFormat { container, codec })
            })
            .transpose()?;

        check_positive("bitrate", self.bitrate)?;
        check_positive("bits per sample", self.bits_per_sample)?;
        check_positive("channel count", self.channel_count)?;
        check_positive("sample rate", self.sample_rate)?;

        let source = &self.audio_properties;
        check_no_upscale(
            "channel count",
            self.channel_count,
            Some(source.channel_count()),
        )?;
        check_no_upscale("sample rate", self.sample_rate, Some(source.sample_rate()))?;
        check_no_upscale(
            "bits per sample",
            self.bits_per_sample,
            source.bits_per_sample(),
        )?;

        log::trace!(
            "build: file={} format={format:?} bitrate={:?} channels={:?} sample_rate={:?} bits={:?}",
            self.file_path.display(),
            self.bitrate,
            self.channel_count,
            self.sample_rate,
            self.bits_per_sample,
        );

        Ok(TranscodeParameters {
            input: TranscodeInputParameters {
                file_path: self.file_path,
                audio_properties: self.audio_properties,
                offset: self.offset,
            },
            output: TranscodeOutputParameters {
                format,
                bitrate: self.bitrate,
                bits_per_sample: self.bits_per_sample,
                channel_count: self.channel_count,
                sample_rate: self.sample_rate,
                strip_metadata: self.strip_metadata,
            },
        })
    }
}

const fn check_positive(
    field: &'static str,
    value: Option<u32>,
) -> Result<(), TranscodeParametersError> {
    match value {
        Some(0) => Err(TranscodeParametersError::Zero { field }),
        _ => Ok(()),
    }
}

const fn check_no_upscale(
    field: &'static str,
    requested: Option<u32>,
    source_value: Option<u32>,
) -> Result<(), TranscodeParametersError> {
    match (requested, source_value) {
        (Some(requested), Some(source_value)) if requested > source_value => {
            Err(TranscodeParametersError::Upscale {
                field,
                requested,
                source_value,
            })
        }
        _ => Ok(()),
    }
}

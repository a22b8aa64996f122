use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Codec, Container, mime_type};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidAudioPropertiesError {
    #[error("Bitrate must be greater than zero")]
    ZeroBitrate,
    #[error("Channel count must be greater than zero")]
    ZeroChannelCount,
    #[error("Sample rate must be greater than zero")]
    ZeroSampleRate,
    #[error("Bits per sample must be greater than zero when present")]
    ZeroBitsPerSample,
}

/// Technical properties of a source audio file.
///
/// Either fully populated and valid, or not constructed at all: bitrate,
/// channel count and sample rate are always positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "AudioPropertiesInner",
    into = "AudioPropertiesInner"
)]
pub struct AudioProperties {
    container: Container,
    codec: Codec,
    duration: Duration,
    bitrate: u32,
    channel_count: u32,
    sample_rate: u32,
    bits_per_sample: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AudioPropertiesInner {
    container: Container,
    codec: Codec,
    duration_ms: u64,
    bitrate: u32,
    channel_count: u32,
    sample_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bits_per_sample: Option<u32>,
}

impl TryFrom<AudioPropertiesInner> for AudioProperties {
    type Error = InvalidAudioPropertiesError;

    fn try_from(value: AudioPropertiesInner) -> Result<Self, Self::Error> {
        Self::try_new(
            value.container,
            value.codec,
            Duration::from_millis(value.duration_ms),
            value.bitrate,
            value.channel_count,
            value.sample_rate,
            value.bits_per_sample,
        )
    }
}

impl From<AudioProperties> for AudioPropertiesInner {
    fn from(value: AudioProperties) -> Self {
        Self {
            container: value.container,
            codec: value.codec,
            duration_ms: u64::try_from(value.duration.as_millis()).unwrap_or(u64::MAX),
            bitrate: value.bitrate,
            channel_count: value.channel_count,
            sample_rate: value.sample_rate,
            bits_per_sample: value.bits_per_sample,
        }
    }
}

impl AudioProperties {
    /// # Errors
    ///
    /// * If `bitrate`, `channel_count` or `sample_rate` is zero
    /// * If `bits_per_sample` is `Some(0)`
    pub const fn try_new(
        container: Container,
        codec: Codec,
        duration: Duration,
        bitrate: u32,
        channel_count: u32,
        sample_rate: u32,
        bits_per_sample: Option<u32>,
    ) -> Result<Self, InvalidAudioPropertiesError> {
        if bitrate == 0 {
            return Err(InvalidAudioPropertiesError::ZeroBitrate);
        }
        if channel_count == 0 {
            return Err(InvalidAudioPropertiesError::ZeroChannelCount);
        }
        if sample_rate == 0 {
            return Err(InvalidAudioPropertiesError::ZeroSampleRate);
        }
        if matches!(bits_per_sample, Some(0)) {
            return Err(InvalidAudioPropertiesError::ZeroBitsPerSample);
        }

        Ok(Self {
            container,
            codec,
            duration,
            bitrate,
            channel_count,
            sample_rate,
            bits_per_sample,
        })
    }

    #[must_use]
    pub const fn container(&self) -> Container {
        self.container
    }

    #[must_use]
    pub const fn codec(&self) -> Codec {
        self.codec
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Bits per second.
    #[must_use]
    pub const fn bitrate(&self) -> u32 {
        self.bitrate
    }

    #[must_use]
    pub const fn channel_count(&self) -> u32 {
        self.channel_count
    }

    /// Hertz.
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Only known for PCM-like sources.
    #[must_use]
    pub const fn bits_per_sample(&self) -> Option<u32> {
        self.bits_per_sample
    }

    #[must_use]
    pub const fn is_lossless(&self) -> bool {
        self.codec.is_lossless()
    }

    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        mime_type(self.container, self.codec)
    }
}

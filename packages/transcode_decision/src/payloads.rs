//! Client capability descriptors and stream details, as exchanged with clients.

use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;
use thiserror::Error;
use tonearm_media::AudioProperties;

/// Codec profile type consulted by the decision engine.
pub const AUDIO_CODEC_PROFILE_TYPE: &str = "AudioCodec";

/// Capabilities a client declares when asking for a transcode decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub platform: String,
    /// Bits per second, applies to direct play
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_audio_bitrate: Option<u32>,
    /// Bits per second, applies to transcoded streams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_transcoding_audio_bitrate: Option<u32>,
    #[serde(default)]
    pub direct_play_profiles: Vec<DirectPlayProfile>,
    /// Priority ordered
    #[serde(default)]
    pub transcoding_profiles: Vec<TranscodingProfile>,
    #[serde(default)]
    pub codec_profiles: Vec<CodecProfile>,
}

/// Empty lists mean "no restriction on this axis".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectPlayProfile {
    #[serde(default)]
    pub containers: Vec<String>,
    #[serde(default)]
    pub audio_codecs: Vec<String>,
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_audio_channels: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodingProfile {
    pub container: String,
    pub audio_codec: String,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_audio_channels: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecProfile {
    #[serde(rename = "type")]
    pub profile_type: String,
    pub name: String,
    #[serde(default)]
    pub limitations: Vec<Limitation>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum LimitationType {
    AudioBitrate,
    AudioChannels,
    AudioSamplerate,
    AudioProfile,
    AudioBitdepth,
}

impl std::fmt::Display for LimitationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    LessThanEqual,
    GreaterThanEqual,
}

/// A codec specific constraint. Non-required limitations are advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limitation {
    pub name: LimitationType,
    pub comparison: ComparisonOperator,
    pub values: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

/// Description of an audio stream, in the client's vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDetails {
    pub protocol: String,
    pub container: String,
    pub codec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_channels: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bitrate: Option<u32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub audio_profile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_samplerate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bitdepth: Option<u32>,
}

impl StreamDetails {
    /// Describes a source file using the catalog's canonical names.
    #[must_use]
    pub fn from_audio_properties(properties: &AudioProperties) -> Self {
        Self {
            protocol: "http".to_string(),
            container: properties.container().name().to_string(),
            codec: properties.codec().name().to_string(),
            audio_channels: Some(properties.channel_count()),
            audio_bitrate: Some(properties.bitrate()),
            audio_profile: String::new(),
            audio_samplerate: Some(properties.sample_rate()),
            audio_bitdepth: properties.bits_per_sample(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseClientInfoError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Codec profile '{codec}': {limitation} limitation has no values")]
    MissingLimitationValues {
        codec: String,
        limitation: LimitationType,
    },
    #[error("Codec profile '{codec}': {limitation} limitation has invalid value '{value}'")]
    InvalidLimitationValue {
        codec: String,
        limitation: LimitationType,
        value: String,
    },
}

/// Parses and validates a client capability descriptor.
///
/// # Errors
///
/// * If the body is not a valid client info JSON document
/// * If a limitation has no values
/// * If a numeric limitation has a value that is not an unsigned integer
pub fn parse_client_info_from_json(body: &str) -> Result<ClientInfo, ParseClientInfoError> {
    let client_info: ClientInfo = serde_json::from_str(body)?;

    client_info.validate()?;

    log::debug!(
        "parse_client_info_from_json: name={} platform={} direct_play_profiles={} transcoding_profiles={} codec_profiles={}",
        client_info.name,
        client_info.platform,
        client_info.direct_play_profiles.len(),
        client_info.transcoding_profiles.len(),
        client_info.codec_profiles.len(),
    );

    Ok(client_info)
}

impl ClientInfo {
    /// # Errors
    ///
    /// * If a limitation has no values
    /// * If a numeric limitation has a value that is not an unsigned integer
    pub fn validate(&self) -> Result<(), ParseClientInfoError> {
        for profile in &self.codec_profiles {
            for limitation in &profile.limitations {
                if limitation.values.is_empty() {
                    return Err(ParseClientInfoError::MissingLimitationValues {
                        codec: profile.name.clone(),
                        limitation: limitation.name,
                    });
                }

                if limitation.name == LimitationType::AudioProfile {
                    continue;
                }

                if let Some(value) = limitation
                    .values
                    .iter()
                    .find(|x| x.trim().parse::<u32>().is_err())
                {
                    return Err(ParseClientInfoError::InvalidLimitationValue {
                        codec: profile.name.clone(),
                        limitation: limitation.name,
                        value: value.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

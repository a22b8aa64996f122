//! Request level glue between the decision engine, the tracker and the
//! transcoder parameters.

use std::{path::PathBuf, time::Duration};

use serde::Serialize;
use thiserror::Error;
use tonearm_config::file::TranscodingConfig;
use tonearm_media::{
    AudioProperties, TranscodeOutputFormat, TranscodeParameters, TranscodeParametersError,
};
use uuid::Uuid;

use crate::{
    audio_file::{AudioFileId, AudioFileInfo},
    decision::{TranscodeDecisionResult, compute_transcode_decision, select_transcode_output_format},
    payloads::{ClientInfo, StreamDetails},
    tracker::TranscodeDecisionTracker,
};

/// Answer to a transcode decision request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeDecisionResponse {
    pub source_stream: StreamDetails,
    pub decision: TranscodeDecisionResult,
    /// Only set for [`TranscodeDecisionResult::Transcode`]
    #[serde(rename = "transcodeParams", skip_serializing_if = "Option::is_none")]
    pub token: Option<Uuid>,
}

impl TranscodeDecisionResponse {
    #[must_use]
    pub const fn can_direct_play(&self) -> bool {
        matches!(self.decision, TranscodeDecisionResult::DirectPlay)
    }

    #[must_use]
    pub const fn can_transcode(&self) -> bool {
        matches!(self.decision, TranscodeDecisionResult::Transcode { .. })
    }
}

/// Computes the decision for a file and remembers transcode targets so the
/// stream request can retrieve them by token.
pub fn handle_transcode_decision(
    tracker: &TranscodeDecisionTracker,
    id: AudioFileId,
    client_info: &ClientInfo,
    file_info: &AudioFileInfo,
) -> TranscodeDecisionResponse {
    let decision = compute_transcode_decision(client_info, &file_info.audio_properties);

    let token = match &decision {
        TranscodeDecisionResult::Transcode { target_stream, .. } => {
            Some(tracker.add(id, target_stream.clone()))
        }
        TranscodeDecisionResult::DirectPlay => None,
        TranscodeDecisionResult::Failure { reason } => {
            log::debug!("handle_transcode_decision: {id} failed: {reason}");
            None
        }
    };

    TranscodeDecisionResponse {
        source_stream: StreamDetails::from_audio_properties(&file_info.audio_properties),
        decision,
        token,
    }
}

#[derive(Debug, Error)]
pub enum StreamRequestError {
    #[error("Transcode decision {0} not found")]
    NotFound(Uuid),
    #[error("Unsupported output format: container={container} codec={codec}")]
    UnsupportedOutputFormat { container: String, codec: String },
    #[error(transparent)]
    Parameters(#[from] TranscodeParametersError),
}

/// Builds the transcoder parameters for a stream request referencing an
/// earlier decision.
///
/// # Errors
///
/// * If the token is unknown, expired, or was issued for another file
/// * If the tracked target is not a format the transcoder can produce
/// * If the tracked target asks for values the source cannot provide
pub fn get_transcoding_parameters(
    tracker: &TranscodeDecisionTracker,
    id: AudioFileId,
    token: &Uuid,
    offset: Duration,
    file_info: AudioFileInfo,
) -> Result<TranscodeParameters, StreamRequestError> {
    let entry = tracker
        .get(token)
        .filter(|x| x.audio_file_id == id)
        .ok_or(StreamRequestError::NotFound(*token))?;
    let target = &entry.target_stream;

    let format = select_transcode_output_format(&target.container, &target.codec).ok_or_else(
        || StreamRequestError::UnsupportedOutputFormat {
            container: target.container.clone(),
            codec: target.codec.clone(),
        },
    )?;

    Ok(
        TranscodeParameters::builder(file_info.path, file_info.audio_properties)
            .offset(offset)
            .format(format)
            .bitrate(target.audio_bitrate)
            .channel_count(target.audio_channels)
            .sample_rate(target.audio_samplerate)
            .bits_per_sample(target.audio_bitdepth)
            .strip_metadata(false)
            .build()?,
    )
}

pub const RAW_FORMAT: &str = "raw";
pub const DEFAULT_TRANSCODING_OUTPUT_FORMAT: TranscodeOutputFormat = TranscodeOutputFormat::OggOpus;
pub const DEFAULT_TRANSCODING_OUTPUT_BITRATE: u32 = 128_000;

/// Per-user transcoding preferences for clients that do not negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserTranscodingSettings {
    pub enable_by_default: bool,
    pub default_format: TranscodeOutputFormat,
    /// Bits per second
    pub default_bitrate: u32,
}

impl Default for UserTranscodingSettings {
    fn default() -> Self {
        Self {
            enable_by_default: false,
            default_format: DEFAULT_TRANSCODING_OUTPUT_FORMAT,
            default_bitrate: DEFAULT_TRANSCODING_OUTPUT_BITRATE,
        }
    }
}

impl UserTranscodingSettings {
    #[must_use]
    pub fn from_config(config: &TranscodingConfig) -> Self {
        let defaults = Self::default();

        Self {
            enable_by_default: config.enable_by_default.unwrap_or(defaults.enable_by_default),
            default_format: config
                .default_output_format
                .as_deref()
                .and_then(legacy_output_format)
                .unwrap_or(defaults.default_format),
            default_bitrate: config
                .default_output_bitrate
                .filter(|x| *x > 0)
                .unwrap_or(defaults.default_bitrate),
        }
    }
}

/// Stream request from a client that does not negotiate through client info.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamRequest {
    pub format: Option<String>,
    /// Kilobits per second, `0` means no limit
    pub max_bit_rate_kbps: u32,
    /// Seconds
    pub time_offset: u64,
    pub estimate_content_length: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamParameters {
    pub file_path: PathBuf,
    pub audio_properties: AudioProperties,
    /// `None` when the file is served as-is
    pub transcode_parameters: Option<TranscodeParameters>,
    pub estimate_content_length: bool,
}

impl StreamParameters {
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        self.transcode_parameters.as_ref().map_or_else(
            || self.audio_properties.mime_type(),
            TranscodeParameters::output_mime_type,
        )
    }
}

fn legacy_output_format(name: &str) -> Option<TranscodeOutputFormat> {
    TranscodeOutputFormat::from_format_name(name).filter(|x| !x.is_lossless())
}

/// Resolves a legacy stream request against the user's preferences.
///
/// # Errors
///
/// * If the resulting transcode parameters are invalid
pub fn get_stream_parameters(
    request: &StreamRequest,
    user: &UserTranscodingSettings,
    file: AudioFileInfo,
) -> Result<StreamParameters, TranscodeParametersError> {
    let max_bitrate = request.max_bit_rate_kbps.saturating_mul(1000);
    let source_bitrate = file.audio_properties.bitrate();
    let within_max = max_bitrate == 0 || source_bitrate <= max_bitrate;

    let passthrough = |file: AudioFileInfo| StreamParameters {
        file_path: file.path,
        audio_properties: file.audio_properties,
        transcode_parameters: None,
        estimate_content_length: request.estimate_content_length,
    };

    if request.format.as_deref() == Some(RAW_FORMAT) {
        return Ok(passthrough(file));
    }

    let requested = request
        .format
        .as_deref()
        .and_then(legacy_output_format)
        .or_else(|| user.enable_by_default.then_some(user.default_format));

    let mut bitrate = None;

    match requested {
        None if within_max => {
            log::debug!("get_stream_parameters: bitrate compatible, no transcoding");
            return Ok(passthrough(file));
        }
        Some(format)
            if format.container() == file.audio_properties.container()
                && format.codec() == file.audio_properties.codec() =>
        {
            if within_max {
                log::debug!("get_stream_parameters: format and bitrate compatible, no transcoding");
                return Ok(passthrough(file));
            }
            bitrate = Some(max_bitrate);
        }
        _ => {}
    }

    let format = requested.unwrap_or(user.default_format);
    let mut bitrate = bitrate.unwrap_or(user.default_bitrate);
    if max_bitrate > 0 {
        bitrate = bitrate.min(max_bitrate);
    }

    log::debug!("get_stream_parameters: transcoding to {format} at {bitrate} bps");

    let transcode_parameters = TranscodeParameters::builder(file.path.clone(), file.audio_properties.clone())
        .offset(Duration::from_secs(request.time_offset))
        .format(format)
        .bitrate(Some(bitrate))
        .strip_metadata(false)
        .build()?;

    Ok(StreamParameters {
        file_path: file.path,
        audio_properties: file.audio_properties,
        transcode_parameters: Some(transcode_parameters),
        estimate_content_length: request.estimate_content_length,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tonearm_media::{Codec, Container};

    use super::*;
    use crate::{
        decision::TranscodeReason,
        payloads::{DirectPlayProfile, TranscodingProfile},
    };

    fn file(container: Container, codec: Codec, bitrate: u32) -> AudioFileInfo {
        AudioFileInfo {
            path: PathBuf::from("/music/track"),
            audio_properties: AudioProperties::try_new(
                container,
                codec,
                Duration::from_secs(240),
                bitrate,
                2,
                44_100,
                None,
            )
            .unwrap(),
        }
    }

    fn mp3_only_client() -> ClientInfo {
        ClientInfo {
            direct_play_profiles: vec![DirectPlayProfile {
                containers: vec!["mp3".to_string()],
                ..DirectPlayProfile::default()
            }],
            transcoding_profiles: vec![TranscodingProfile {
                container: "mp3".to_string(),
                audio_codec: "mp3".to_string(),
                protocol: "http".to_string(),
                max_audio_channels: None,
            }],
            ..ClientInfo::default()
        }
    }

    #[test_log::test]
    fn direct_play_issues_no_token() {
        let tracker = TranscodeDecisionTracker::new();
        let response = handle_transcode_decision(
            &tracker,
            AudioFileId::Track(1),
            &mp3_only_client(),
            &file(Container::Mpeg, Codec::Mp3, 192_000),
        );

        assert!(response.can_direct_play());
        assert!(!response.can_transcode());
        assert_eq!(response.token, None);
        assert_eq!(response.source_stream.container, "MPEG");
        assert!(tracker.is_empty());
    }

    #[test_log::test]
    fn transcode_token_resolves_to_parameters() {
        let tracker = TranscodeDecisionTracker::new();
        let source = file(Container::Ogg, Codec::Vorbis, 160_000);
        let response = handle_transcode_decision(
            &tracker,
            AudioFileId::Track(4),
            &mp3_only_client(),
            &source,
        );

        assert!(response.can_transcode());
        let TranscodeDecisionResult::Transcode { reasons, .. } = &response.decision else {
            panic!("expected transcode");
        };
        assert_eq!(reasons, &vec![TranscodeReason::ContainerNotSupported]);

        let params = get_transcoding_parameters(
            &tracker,
            AudioFileId::Track(4),
            &response.token.unwrap(),
            Duration::from_secs(30),
            source,
        )
        .unwrap();

        assert_eq!(params.output.format, Some(TranscodeOutputFormat::Mp3));
        assert_eq!(params.output.bitrate, Some(160_000));
        assert_eq!(params.input.offset, Duration::from_secs(30));
        assert!(!params.output.strip_metadata);
        assert_eq!(params.output_mime_type(), "audio/mpeg");
    }

    #[test_log::test]
    fn token_for_another_file_is_not_found() {
        let tracker = TranscodeDecisionTracker::new();
        let source = file(Container::Ogg, Codec::Vorbis, 160_000);
        let response = handle_transcode_decision(
            &tracker,
            AudioFileId::Track(4),
            &mp3_only_client(),
            &source,
        );
        let token = response.token.unwrap();

        assert!(matches!(
            get_transcoding_parameters(
                &tracker,
                AudioFileId::Track(5),
                &token,
                Duration::ZERO,
                source.clone()
            ),
            Err(StreamRequestError::NotFound(x)) if x == token
        ));
        assert!(matches!(
            get_transcoding_parameters(
                &tracker,
                AudioFileId::Track(4),
                &Uuid::new_v4(),
                Duration::ZERO,
                source
            ),
            Err(StreamRequestError::NotFound(_))
        ));
    }

    #[test_log::test]
    fn unsupported_tracked_format_is_rejected() {
        let tracker = TranscodeDecisionTracker::new();
        let token = tracker.add(
            AudioFileId::Track(1),
            StreamDetails {
                protocol: "http".to_string(),
                container: "mp4".to_string(),
                codec: "aac".to_string(),
                ..StreamDetails::default()
            },
        );

        assert!(matches!(
            get_transcoding_parameters(
                &tracker,
                AudioFileId::Track(1),
                &token,
                Duration::ZERO,
                file(Container::Flac, Codec::Flac, 900_000)
            ),
            Err(StreamRequestError::UnsupportedOutputFormat { .. })
        ));
    }

    #[test_log::test]
    fn response_serializes_token_as_transcode_params() {
        let tracker = TranscodeDecisionTracker::new();
        let response = handle_transcode_decision(
            &tracker,
            AudioFileId::Track(4),
            &mp3_only_client(),
            &file(Container::Ogg, Codec::Vorbis, 160_000),
        );
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["decision"]["result"], "transcode");
        assert_eq!(
            json["transcodeParams"],
            serde_json::Value::String(response.token.unwrap().to_string())
        );
        assert_eq!(json["sourceStream"]["codec"], "Vorbis");
    }

    fn request(format: Option<&str>, max_bit_rate_kbps: u32) -> StreamRequest {
        StreamRequest {
            format: format.map(ToString::to_string),
            max_bit_rate_kbps,
            time_offset: 12,
            estimate_content_length: true,
        }
    }

    #[test_log::test]
    fn raw_format_never_transcodes() {
        let user = UserTranscodingSettings {
            enable_by_default: true,
            ..UserTranscodingSettings::default()
        };
        let params = get_stream_parameters(
            &request(Some("raw"), 64),
            &user,
            file(Container::Flac, Codec::Flac, 900_000),
        )
        .unwrap();

        assert_eq!(params.transcode_parameters, None);
        assert!(params.estimate_content_length);
        assert_eq!(params.mime_type(), "audio/flac");
    }

    #[test_log::test]
    fn no_format_within_cap_is_served_as_is() {
        let params = get_stream_parameters(
            &request(None, 320),
            &UserTranscodingSettings::default(),
            file(Container::Mpeg, Codec::Mp3, 256_000),
        )
        .unwrap();

        assert_eq!(params.transcode_parameters, None);
    }

    #[test_log::test]
    fn no_format_above_cap_uses_user_default_capped() {
        let params = get_stream_parameters(
            &request(None, 96),
            &UserTranscodingSettings::default(),
            file(Container::Flac, Codec::Flac, 900_000),
        )
        .unwrap();
        let transcode = params.transcode_parameters.unwrap();

        assert_eq!(transcode.output.format, Some(TranscodeOutputFormat::OggOpus));
        assert_eq!(transcode.output.bitrate, Some(96_000));
        assert_eq!(transcode.input.offset, Duration::from_secs(12));
        assert!(!transcode.output.strip_metadata);
    }

    #[test_log::test]
    fn same_format_is_served_as_is_within_cap() {
        let params = get_stream_parameters(
            &request(Some("MP3"), 0),
            &UserTranscodingSettings::default(),
            file(Container::Mpeg, Codec::Mp3, 320_000),
        )
        .unwrap();

        assert_eq!(params.transcode_parameters, None);
    }

    #[test_log::test]
    fn same_format_above_cap_is_transcoded_at_cap() {
        let params = get_stream_parameters(
            &request(Some("mp3"), 192),
            &UserTranscodingSettings::default(),
            file(Container::Mpeg, Codec::Mp3, 320_000),
        )
        .unwrap();
        let transcode = params.transcode_parameters.unwrap();

        assert_eq!(transcode.output.format, Some(TranscodeOutputFormat::Mp3));
        assert_eq!(transcode.output.bitrate, Some(192_000));
    }

    #[test_log::test]
    fn other_format_uses_default_bitrate() {
        let params = get_stream_parameters(
            &request(Some("vorbis"), 0),
            &UserTranscodingSettings::default(),
            file(Container::Mpeg, Codec::Mp3, 320_000),
        )
        .unwrap();
        assert_eq!(params.mime_type(), "audio/ogg; codecs=\"vorbis\"");

        let transcode = params.transcode_parameters.unwrap();

        assert_eq!(transcode.output.format, Some(TranscodeOutputFormat::OggVorbis));
        assert_eq!(transcode.output.bitrate, Some(DEFAULT_TRANSCODING_OUTPUT_BITRATE));
    }

    #[test_log::test]
    fn transcoding_by_default_applies_without_format() {
        let user = UserTranscodingSettings {
            enable_by_default: true,
            default_format: TranscodeOutputFormat::Mp3,
            default_bitrate: 192_000,
        };
        let params = get_stream_parameters(
            &request(Some("flac"), 0),
            &user,
            file(Container::Flac, Codec::Flac, 900_000),
        )
        .unwrap();
        let transcode = params.transcode_parameters.unwrap();

        assert_eq!(transcode.output.format, Some(TranscodeOutputFormat::Mp3));
        assert_eq!(transcode.output.bitrate, Some(192_000));
    }

    #[test_log::test]
    fn user_settings_from_config() {
        let settings = UserTranscodingSettings::from_config(&TranscodingConfig {
            ffmpeg_path: None,
            default_output_format: Some("Vorbis".to_string()),
            default_output_bitrate: Some(0),
            enable_by_default: Some(true),
        });

        assert_eq!(
            settings,
            UserTranscodingSettings {
                enable_by_default: true,
                default_format: TranscodeOutputFormat::OggVorbis,
                default_bitrate: DEFAULT_TRANSCODING_OUTPUT_BITRATE,
            }
        );
    }
}

//! Direct play / transcode decision engine.
//!
//! [`compute_transcode_decision`] is pure: it only looks at the client's
//! declared capabilities and the source's audio properties.

use serde::{Serialize, Serializer};
use tonearm_media::{AudioProperties, Codec, Container, TranscodeOutputFormat};

use crate::{
    limitation::{AdjustResult, apply_limitation, is_stream_compatible_with_limitation},
    payloads::{
        AUDIO_CODEC_PROFILE_TYPE, ClientInfo, CodecProfile, DirectPlayProfile, LimitationType,
        StreamDetails, TranscodingProfile,
    },
};

/// The only delivery protocol the server implements.
pub const HTTP_PROTOCOL: &str = "http";

/// Bitrate used when transcoding a lossless source to a lossy codec without
/// a client supplied cap.
pub const DEFAULT_LOSSY_TRANSCODE_BITRATE: u32 = 256_000;

pub const NO_COMPATIBLE_PROFILE_REASON: &str =
    "No compatible direct play or transcoding profile found";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TranscodeReason {
    AudioCodecNotSupported,
    AudioBitrateNotSupported,
    AudioChannelsNotSupported,
    AudioSampleRateNotSupported,
    AudioBitdepthNotSupported,
    ContainerNotSupported,
    ProtocolNotSupported,
}

impl TranscodeReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AudioCodecNotSupported => "audio codec not supported",
            Self::AudioBitrateNotSupported => "audio bitrate not supported",
            Self::AudioChannelsNotSupported => "audio channels not supported",
            Self::AudioSampleRateNotSupported => "audio samplerate not supported",
            Self::AudioBitdepthNotSupported => "audio bitdepth not supported",
            Self::ContainerNotSupported => "container not supported",
            Self::ProtocolNotSupported => "protocol not supported",
        }
    }

    const fn from_limitation(limitation: LimitationType) -> Self {
        match limitation {
            LimitationType::AudioBitrate => Self::AudioBitrateNotSupported,
            LimitationType::AudioChannels => Self::AudioChannelsNotSupported,
            LimitationType::AudioSamplerate => Self::AudioSampleRateNotSupported,
            LimitationType::AudioProfile => Self::AudioCodecNotSupported,
            LimitationType::AudioBitdepth => Self::AudioBitdepthNotSupported,
        }
    }
}

impl std::fmt::Display for TranscodeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TranscodeReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TranscodeDecisionResult {
    DirectPlay,
    Transcode {
        /// One entry per rejected direct play profile, or the global bitrate cap
        reasons: Vec<TranscodeReason>,
        target_stream: StreamDetails,
    },
    Failure {
        reason: String,
    },
}

/// Resolves client-facing container and codec names to a format the
/// transcoder can produce.
#[must_use]
pub fn select_transcode_output_format(
    container_name: &str,
    codec_name: &str,
) -> Option<TranscodeOutputFormat> {
    tonearm_media::SUPPORTED_TRANSCODE_OUTPUT_FORMATS
        .into_iter()
        .find(|x| x.codec().matches_name(codec_name) && x.container().matches_name(container_name))
}

fn find_audio_codec_profile(codec_profiles: &[CodecProfile], codec: Codec) -> Option<&CodecProfile> {
    codec_profiles
        .iter()
        .filter(|x| x.profile_type == AUDIO_CODEC_PROFILE_TYPE)
        .find(|x| codec.matches_name(&x.name))
}

fn matches_any_container(container: Container, names: &[String]) -> bool {
    names.is_empty() || names.iter().any(|x| container.matches_name(x))
}

fn matches_any_codec(codec: Codec, names: &[String]) -> bool {
    names.is_empty() || names.iter().any(|x| codec.matches_name(x))
}

fn needs_transcode(
    profile: &DirectPlayProfile,
    codec_profiles: &[CodecProfile],
    source: &AudioProperties,
) -> Option<TranscodeReason> {
    if !matches_any_container(source.container(), &profile.containers) {
        return Some(TranscodeReason::ContainerNotSupported);
    }
    if !matches_any_codec(source.codec(), &profile.audio_codecs) {
        return Some(TranscodeReason::AudioCodecNotSupported);
    }
    if !profile.protocols.is_empty() && !profile.protocols.iter().any(|x| x == HTTP_PROTOCOL) {
        return Some(TranscodeReason::ProtocolNotSupported);
    }
    if profile
        .max_audio_channels
        .is_some_and(|max| source.channel_count() > max)
    {
        return Some(TranscodeReason::AudioChannelsNotSupported);
    }

    find_audio_codec_profile(codec_profiles, source.codec())?
        .limitations
        .iter()
        .find(|x| !is_stream_compatible_with_limitation(source, x))
        .map(|x| TranscodeReason::from_limitation(x.name))
}

fn can_direct_play(
    client_info: &ClientInfo,
    source: &AudioProperties,
    reasons: &mut Vec<TranscodeReason>,
) -> bool {
    if client_info
        .max_audio_bitrate
        .is_some_and(|max| max < source.bitrate())
    {
        reasons.push(TranscodeReason::AudioBitrateNotSupported);
        return false;
    }

    for profile in &client_info.direct_play_profiles {
        match needs_transcode(profile, &client_info.codec_profiles, source) {
            None => return true,
            Some(reason) => reasons.push(reason),
        }
    }

    false
}

fn compute_transcoded_stream(
    max_bitrate: Option<u32>,
    profile: &TranscodingProfile,
    codec_profiles: &[CodecProfile],
    source: &AudioProperties,
) -> Option<StreamDetails> {
    if profile.protocol != HTTP_PROTOCOL {
        log::trace!("compute_transcoded_stream: unsupported protocol '{}'", profile.protocol);
        return None;
    }

    let Some(format) = select_transcode_output_format(&profile.container, &profile.audio_codec)
    else {
        log::trace!(
            "compute_transcoded_stream: unsupported format container='{}' codec='{}'",
            profile.container,
            profile.audio_codec,
        );
        return None;
    };

    let mut target = StreamDetails {
        protocol: HTTP_PROTOCOL.to_string(),
        container: profile.container.clone(),
        codec: profile.audio_codec.clone(),
        ..StreamDetails::default()
    };

    match (source.is_lossless(), format.is_lossless()) {
        (true, false) => {
            target.audio_bitrate = Some(max_bitrate.unwrap_or(DEFAULT_LOSSY_TRANSCODE_BITRATE));
        }
        (true, true) => {
            if max_bitrate.is_some_and(|max| source.bitrate() > max) {
                return None;
            }
        }
        (false, true) => return None,
        (false, false) => target.audio_bitrate = Some(source.bitrate()),
    }

    if let Some(max) = max_bitrate
        && source.bitrate() > max
    {
        target.audio_bitrate = Some(max);
    }

    if let Some(max) = profile.max_audio_channels
        && source.channel_count() > max
    {
        target.audio_channels = Some(max);
    }

    if let Some(codec_profile) = find_audio_codec_profile(codec_profiles, format.codec()) {
        for limitation in codec_profile.limitations.iter().filter(|x| x.required) {
            let result = apply_limitation(source, limitation, &mut target);

            match result {
                AdjustResult::CannotAdjust => return None,
                AdjustResult::Adjusted(_)
                    if limitation.name == LimitationType::AudioBitrate && format.is_lossless() =>
                {
                    return None;
                }
                AdjustResult::Adjusted(_) | AdjustResult::Unchanged => {}
            }
        }
    }

    Some(target)
}

/// Decides how a source should be delivered to a client.
///
/// Direct play wins if any direct play profile accepts the source. Otherwise
/// the first transcoding profile able to produce a compatible stream wins;
/// profile order is the client's priority order.
#[must_use]
pub fn compute_transcode_decision(
    client_info: &ClientInfo,
    source: &AudioProperties,
) -> TranscodeDecisionResult {
    let mut reasons = vec![];

    if can_direct_play(client_info, source, &mut reasons) {
        log::debug!("compute_transcode_decision: direct play");
        return TranscodeDecisionResult::DirectPlay;
    }

    log::debug!("compute_transcode_decision: direct play not possible reasons={reasons:?}");

    for profile in &client_info.transcoding_profiles {
        if let Some(target_stream) = compute_transcoded_stream(
            client_info.max_transcoding_audio_bitrate,
            profile,
            &client_info.codec_profiles,
            source,
        ) {
            log::debug!("compute_transcode_decision: transcode target_stream={target_stream:?}");
            return TranscodeDecisionResult::Transcode {
                reasons,
                target_stream,
            };
        }
    }

    TranscodeDecisionResult::Failure {
        reason: NO_COMPATIBLE_PROFILE_REASON.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::payloads::{ComparisonOperator, Limitation};

    fn source(
        container: Container,
        codec: Codec,
        bitrate: u32,
        channels: u32,
        sample_rate: u32,
        bits_per_sample: Option<u32>,
    ) -> AudioProperties {
        AudioProperties::try_new(
            container,
            codec,
            Duration::from_secs(60),
            bitrate,
            channels,
            sample_rate,
            bits_per_sample,
        )
        .unwrap()
    }

    fn mp3_source(bitrate: u32, channels: u32, sample_rate: u32) -> AudioProperties {
        source(Container::Mpeg, Codec::Mp3, bitrate, channels, sample_rate, None)
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn direct_play(
        containers: &[&str],
        codecs: &[&str],
        protocols: &[&str],
        max_audio_channels: Option<u32>,
    ) -> DirectPlayProfile {
        DirectPlayProfile {
            containers: strings(containers),
            audio_codecs: strings(codecs),
            protocols: strings(protocols),
            max_audio_channels,
        }
    }

    fn transcoding(container: &str, codec: &str, max_audio_channels: Option<u32>) -> TranscodingProfile {
        TranscodingProfile {
            container: container.to_string(),
            audio_codec: codec.to_string(),
            protocol: HTTP_PROTOCOL.to_string(),
            max_audio_channels,
        }
    }

    fn codec_profile(name: &str, limitation: Option<(LimitationType, u32)>) -> CodecProfile {
        CodecProfile {
            profile_type: AUDIO_CODEC_PROFILE_TYPE.to_string(),
            name: name.to_string(),
            limitations: limitation
                .into_iter()
                .map(|(name, value)| Limitation {
                    name,
                    comparison: ComparisonOperator::LessThanEqual,
                    values: vec![value.to_string()],
                    required: true,
                })
                .collect(),
        }
    }

    fn mp3_client(
        max_audio_bitrate: Option<u32>,
        max_transcoding_audio_bitrate: Option<u32>,
        max_audio_channels: Option<u32>,
        limitation: Option<(LimitationType, u32)>,
    ) -> ClientInfo {
        ClientInfo {
            name: "TestClient".to_string(),
            platform: "TestPlatform".to_string(),
            max_audio_bitrate,
            max_transcoding_audio_bitrate,
            direct_play_profiles: vec![direct_play(
                &["mp3"],
                &["mp3"],
                &["http"],
                max_audio_channels,
            )],
            transcoding_profiles: vec![transcoding("mp3", "mp3", max_audio_channels)],
            codec_profiles: vec![codec_profile("mp3", limitation)],
        }
    }

    fn transcode(
        reasons: Vec<TranscodeReason>,
        container: &str,
        codec: &str,
        stream: StreamDetails,
    ) -> TranscodeDecisionResult {
        TranscodeDecisionResult::Transcode {
            reasons,
            target_stream: StreamDetails {
                protocol: "http".to_string(),
                container: container.to_string(),
                codec: codec.to_string(),
                ..stream
            },
        }
    }

    fn bitrate(audio_bitrate: u32) -> StreamDetails {
        StreamDetails {
            audio_bitrate: Some(audio_bitrate),
            ..StreamDetails::default()
        }
    }

    fn sonos_client(max_bitrate: Option<u32>) -> ClientInfo {
        ClientInfo {
            name: "SONOS".to_string(),
            platform: "UPnP".to_string(),
            max_audio_bitrate: max_bitrate,
            max_transcoding_audio_bitrate: max_bitrate,
            direct_play_profiles: vec![
                direct_play(&["flac"], &[], &[], None),
                direct_play(&["mp3"], &["mp3"], &[], None),
                direct_play(&["m4a", "mp4"], &["aac"], &[], None),
            ],
            transcoding_profiles: vec![
                transcoding("flac", "flac", Some(6)),
                transcoding("aac", "aac", Some(6)),
                transcoding("mp3", "mp3", Some(2)),
            ],
            codec_profiles: vec![
                codec_profile("flac", Some((LimitationType::AudioSamplerate, 48_000))),
                codec_profile("vorbis", Some((LimitationType::AudioSamplerate, 48_000))),
                codec_profile("opus", Some((LimitationType::AudioSamplerate, 48_000))),
            ],
        }
    }

    #[test_log::test]
    fn direct_play_when_profile_and_limitations_match() {
        let client = mp3_client(
            Some(512_000),
            Some(256_000),
            Some(2),
            Some((LimitationType::AudioBitrate, 256_000)),
        );

        assert_eq!(
            compute_transcode_decision(&client, &mp3_source(128_000, 2, 44_100)),
            TranscodeDecisionResult::DirectPlay
        );
    }

    #[test_log::test]
    fn codec_bitrate_limitation_forces_transcode() {
        let client = mp3_client(
            Some(512_000),
            Some(96_000),
            Some(2),
            Some((LimitationType::AudioBitrate, 96_000)),
        );

        assert_eq!(
            compute_transcode_decision(&client, &mp3_source(128_000, 2, 44_100)),
            transcode(
                vec![TranscodeReason::AudioBitrateNotSupported],
                "mp3",
                "mp3",
                bitrate(96_000)
            )
        );
    }

    #[test_log::test]
    fn global_bitrate_cap_rejects_direct_play_outright() {
        let client = mp3_client(
            Some(96_000),
            Some(96_000),
            Some(2),
            Some((LimitationType::AudioBitrate, 256_000)),
        );

        assert_eq!(
            compute_transcode_decision(&client, &mp3_source(128_000, 2, 44_100)),
            transcode(
                vec![TranscodeReason::AudioBitrateNotSupported],
                "mp3",
                "mp3",
                bitrate(96_000)
            )
        );
    }

    #[test_log::test]
    fn global_transcoding_cap_is_more_restrictive_than_codec_limitation() {
        let client = mp3_client(
            Some(96_000),
            Some(96_000),
            Some(2),
            Some((LimitationType::AudioBitrate, 128_000)),
        );

        assert_eq!(
            compute_transcode_decision(&client, &mp3_source(192_000, 2, 44_100)),
            transcode(
                vec![TranscodeReason::AudioBitrateNotSupported],
                "mp3",
                "mp3",
                bitrate(96_000)
            )
        );
    }

    #[test_log::test]
    fn sample_rate_limitation_adjusts_target() {
        let client = mp3_client(
            Some(320_000),
            Some(320_000),
            Some(2),
            Some((LimitationType::AudioSamplerate, 48_000)),
        );

        assert_eq!(
            compute_transcode_decision(&client, &mp3_source(192_000, 2, 96_000)),
            transcode(
                vec![TranscodeReason::AudioSampleRateNotSupported],
                "mp3",
                "mp3",
                StreamDetails {
                    audio_bitrate: Some(192_000),
                    audio_samplerate: Some(48_000),
                    ..StreamDetails::default()
                }
            )
        );
    }

    #[test_log::test]
    fn profile_channel_cap_downmixes() {
        let client = mp3_client(Some(320_000), Some(320_000), Some(2), None);

        assert_eq!(
            compute_transcode_decision(&client, &mp3_source(192_000, 5, 48_000)),
            transcode(
                vec![TranscodeReason::AudioChannelsNotSupported],
                "mp3",
                "mp3",
                StreamDetails {
                    audio_channels: Some(2),
                    audio_bitrate: Some(192_000),
                    ..StreamDetails::default()
                }
            )
        );
    }

    #[test_log::test]
    fn codec_channel_limitation_downmixes() {
        let client = mp3_client(
            Some(320_000),
            Some(320_000),
            None,
            Some((LimitationType::AudioChannels, 2)),
        );

        assert_eq!(
            compute_transcode_decision(&client, &mp3_source(192_000, 5, 48_000)),
            transcode(
                vec![TranscodeReason::AudioChannelsNotSupported],
                "mp3",
                "mp3",
                StreamDetails {
                    audio_channels: Some(2),
                    audio_bitrate: Some(192_000),
                    ..StreamDetails::default()
                }
            )
        );
    }

    #[test_log::test]
    fn unsupported_container_keeps_lossy_source_bitrate() {
        let client = mp3_client(
            Some(320_000),
            Some(320_000),
            None,
            Some((LimitationType::AudioChannels, 2)),
        );

        assert_eq!(
            compute_transcode_decision(
                &client,
                &source(Container::Ogg, Codec::Opus, 128_000, 2, 48_000, None)
            ),
            transcode(
                vec![TranscodeReason::ContainerNotSupported],
                "mp3",
                "mp3",
                bitrate(128_000)
            )
        );
    }

    #[test_log::test]
    fn lossless_source_uses_transcoding_cap() {
        let client = mp3_client(Some(1_000_000), Some(320_000), None, None);

        assert_eq!(
            compute_transcode_decision(
                &client,
                &source(Container::Flac, Codec::Flac, 750_000, 2, 48_000, Some(16))
            ),
            transcode(
                vec![TranscodeReason::ContainerNotSupported],
                "mp3",
                "mp3",
                bitrate(320_000)
            )
        );
    }

    #[test_log::test]
    fn lossless_source_without_cap_uses_default_bitrate() {
        let mut client = mp3_client(None, None, None, None);
        client.codec_profiles.clear();

        assert_eq!(
            compute_transcode_decision(
                &client,
                &source(Container::Flac, Codec::Flac, 750_000, 2, 48_000, Some(16))
            ),
            transcode(
                vec![TranscodeReason::ContainerNotSupported],
                "mp3",
                "mp3",
                bitrate(DEFAULT_LOSSY_TRANSCODE_BITRATE)
            )
        );
    }

    #[test_log::test]
    fn empty_codec_and_protocol_lists_accept_anything() {
        let client = ClientInfo {
            max_audio_bitrate: Some(1_000_000),
            max_transcoding_audio_bitrate: Some(320_000),
            direct_play_profiles: vec![direct_play(&["mp4", "flac", "mp3"], &[], &[], None)],
            ..ClientInfo::default()
        };

        assert_eq!(
            compute_transcode_decision(&client, &mp3_source(128_000, 2, 48_000)),
            TranscodeDecisionResult::DirectPlay
        );
    }

    #[test_log::test]
    fn empty_container_list_accepts_anything() {
        let client = ClientInfo {
            max_audio_bitrate: Some(1_000_000),
            max_transcoding_audio_bitrate: Some(320_000),
            direct_play_profiles: vec![direct_play(&[], &["mp3"], &[], None)],
            ..ClientInfo::default()
        };

        assert_eq!(
            compute_transcode_decision(&client, &mp3_source(128_000, 2, 48_000)),
            TranscodeDecisionResult::DirectPlay
        );
    }

    #[test_log::test]
    fn first_usable_transcoding_profile_wins() {
        let client = ClientInfo {
            name: "LocalDevice".to_string(),
            platform: "Android".to_string(),
            max_audio_bitrate: Some(320_000),
            max_transcoding_audio_bitrate: Some(320_000),
            direct_play_profiles: vec![direct_play(&["flac"], &["flac"], &[], Some(32))],
            transcoding_profiles: vec![
                transcoding("ogg", "opus", None),
                transcoding("mp3", "mp3", Some(2)),
            ],
            codec_profiles: vec![],
        };

        assert_eq!(
            compute_transcode_decision(
                &client,
                &source(Container::Flac, Codec::Flac, 1_000_000, 2, 48_000, Some(16))
            ),
            transcode(
                vec![TranscodeReason::AudioBitrateNotSupported],
                "ogg",
                "opus",
                bitrate(320_000)
            )
        );
    }

    #[test_log::test]
    fn lossless_target_keeps_bitrate_unset_and_lowers_sample_rate() {
        let expected = transcode(
            vec![
                TranscodeReason::AudioSampleRateNotSupported,
                TranscodeReason::ContainerNotSupported,
                TranscodeReason::ContainerNotSupported,
            ],
            "flac",
            "flac",
            StreamDetails {
                audio_samplerate: Some(48_000),
                ..StreamDetails::default()
            },
        );
        let flac_96k = source(Container::Flac, Codec::Flac, 950_000, 2, 96_000, Some(24));

        assert_eq!(
            compute_transcode_decision(&sonos_client(Some(1_000_000)), &flac_96k),
            expected
        );
        assert_eq!(compute_transcode_decision(&sonos_client(None), &flac_96k), expected);
    }

    #[test_log::test]
    fn lossy_source_skips_lossless_and_unsupported_targets() {
        assert_eq!(
            compute_transcode_decision(
                &sonos_client(Some(1_000_000)),
                &source(Container::Ogg, Codec::Vorbis, 128_000, 2, 48_000, Some(16))
            ),
            transcode(
                vec![TranscodeReason::ContainerNotSupported; 3],
                "mp3",
                "mp3",
                bitrate(128_000)
            )
        );
    }

    #[test_log::test]
    fn lossless_source_transcodes_to_lossless_target() {
        assert_eq!(
            compute_transcode_decision(
                &sonos_client(Some(1_000_000)),
                &source(Container::Dsf, Codec::Dsd, 950_000, 2, 96_000, Some(24))
            ),
            transcode(
                vec![TranscodeReason::ContainerNotSupported; 3],
                "flac",
                "flac",
                StreamDetails {
                    audio_samplerate: Some(48_000),
                    ..StreamDetails::default()
                }
            )
        );
    }

    #[test_log::test]
    fn lossless_to_lossless_rejected_above_transcoding_cap() {
        let mut client = sonos_client(Some(500_000));
        client.transcoding_profiles.truncate(1);

        assert_eq!(
            compute_transcode_decision(
                &client,
                &source(Container::Wav, Codec::Pcm, 1_411_200, 2, 44_100, Some(16))
            ),
            TranscodeDecisionResult::Failure {
                reason: NO_COMPATIBLE_PROFILE_REASON.to_string(),
            }
        );
    }

    #[test_log::test]
    fn non_http_protocols_are_rejected() {
        let mut client = mp3_client(Some(512_000), None, None, None);
        client.direct_play_profiles[0].protocols = strings(&["hls"]);
        client.transcoding_profiles[0].protocol = "hls".to_string();

        assert_eq!(
            compute_transcode_decision(&client, &mp3_source(128_000, 2, 44_100)),
            TranscodeDecisionResult::Failure {
                reason: NO_COMPATIBLE_PROFILE_REASON.to_string(),
            }
        );
    }

    #[test_log::test]
    fn direct_play_protocol_list_without_http_gives_reason() {
        let mut client = mp3_client(Some(512_000), None, None, None);
        client.direct_play_profiles[0].protocols = strings(&["hls"]);

        assert_eq!(
            compute_transcode_decision(&client, &mp3_source(128_000, 2, 44_100)),
            transcode(
                vec![TranscodeReason::ProtocolNotSupported],
                "mp3",
                "mp3",
                bitrate(128_000)
            )
        );
    }

    #[test_log::test]
    fn advisory_limitations_never_force_transcoding() {
        let mut client = mp3_client(None, None, None, Some((LimitationType::AudioBitrate, 64_000)));
        client.codec_profiles[0].limitations[0].required = false;

        assert_eq!(
            compute_transcode_decision(&client, &mp3_source(128_000, 2, 44_100)),
            TranscodeDecisionResult::DirectPlay
        );
    }

    #[test_log::test]
    fn bitrate_limitation_adjusting_lossless_target_rejects_profile() {
        let client = ClientInfo {
            transcoding_profiles: vec![
                transcoding("flac", "flac", None),
                transcoding("ogg", "vorbis", None),
            ],
            codec_profiles: vec![codec_profile(
                "flac",
                Some((LimitationType::AudioBitrate, 500_000)),
            )],
            ..ClientInfo::default()
        };

        assert_eq!(
            compute_transcode_decision(
                &client,
                &source(Container::Wav, Codec::Pcm, 1_411_200, 2, 44_100, Some(16))
            ),
            transcode(vec![], "ogg", "vorbis", bitrate(DEFAULT_LOSSY_TRANSCODE_BITRATE))
        );
    }

    #[test_log::test]
    fn result_serializes_with_reason_strings() {
        let result = transcode(
            vec![TranscodeReason::ContainerNotSupported],
            "mp3",
            "mp3",
            bitrate(128_000),
        );

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({
                "result": "transcode",
                "reasons": ["container not supported"],
                "targetStream": {
                    "protocol": "http",
                    "container": "mp3",
                    "codec": "mp3",
                    "audioBitrate": 128000,
                },
            })
        );
    }

    #[test_log::test]
    fn repeated_decisions_are_identical() {
        let mut mp3_profile = codec_profile("mp3", Some((LimitationType::AudioBitrate, 320_000)));
        mp3_profile.limitations.push(Limitation {
            name: LimitationType::AudioChannels,
            comparison: ComparisonOperator::Equals,
            values: strings(&["1", "2"]),
            required: true,
        });
        let mut client = sonos_client(Some(1_500_000));
        client.codec_profiles.push(mp3_profile);
        let flac = source(Container::Flac, Codec::Flac, 2_300_000, 2, 96_000, Some(24));
        let mp3 = mp3_source(128_000, 2, 44_100);

        let first = compute_transcode_decision(&client, &flac);
        assert!(matches!(first, TranscodeDecisionResult::Transcode { .. }));
        assert_eq!(compute_transcode_decision(&client, &flac), first);

        let first = compute_transcode_decision(&client, &mp3);
        assert_eq!(first, TranscodeDecisionResult::DirectPlay);
        assert_eq!(compute_transcode_decision(&client, &mp3), first);
    }

    #[test_log::test]
    fn low_bitrate_lossless_source_still_gets_default_lossy_bitrate() {
        let mut client = mp3_client(None, None, None, None);
        client.direct_play_profiles.clear();
        client.codec_profiles.clear();

        assert_eq!(
            compute_transcode_decision(
                &client,
                &source(Container::Flac, Codec::Flac, 200_000, 2, 44_100, Some(16))
            ),
            transcode(vec![], "mp3", "mp3", bitrate(DEFAULT_LOSSY_TRANSCODE_BITRATE))
        );
    }

    #[test_log::test]
    fn select_output_format_matches_aliases() {
        assert_eq!(
            select_transcode_output_format("oga", "OPUS"),
            Some(TranscodeOutputFormat::OggOpus)
        );
        assert_eq!(
            select_transcode_output_format("mpeg", "mp3"),
            Some(TranscodeOutputFormat::Mp3)
        );
        assert_eq!(select_transcode_output_format("mp4", "aac"), None);
        assert_eq!(select_transcode_output_format("ogg", "mp3"), None);
    }
}

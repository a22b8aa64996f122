use crate::{Codec, Container};

/// MIME type served for a stream whose container is unknown.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// MIME type of an audio stream.
///
/// MP4 and Ogg are refined by the codec they carry; every other container
/// maps to a single type.
#[must_use]
pub const fn mime_type(container: Container, codec: Codec) -> &'static str {
    match container {
        Container::Aiff => "audio/x-aiff",
        Container::Ape => "audio/x-monkeys-audio",
        Container::Asf => "audio/x-ms-wma",
        Container::Dsf => "audio/x-dsd-dsf",
        Container::Flac => "audio/flac",
        Container::Mp4 => match codec {
            Codec::Aac => "audio/mp4; codecs=\"mp4a.40.2\"",
            Codec::Alac => "audio/mp4; codecs=\"alac\"",
            Codec::Mp4Als => "audio/mp4; codecs=\"mp4als\"",
            _ => "audio/mp4",
        },
        Container::Mpc => "audio/x-musepack",
        Container::Mpeg => "audio/mpeg",
        Container::Ogg => match codec {
            Codec::Opus => "audio/opus",
            Codec::Vorbis => "audio/ogg; codecs=\"vorbis\"",
            Codec::Flac => "audio/ogg; codecs=\"flac\"",
            _ => "audio/ogg",
        },
        Container::Shorten => "audio/x-shn",
        Container::TrueAudio => "audio/x-tta",
        Container::Wav => "audio/wav",
        Container::WavPack => "audio/x-wavpack",
    }
}

/// MIME type for client-facing container and codec names.
///
/// Unknown containers yield [`FALLBACK_MIME_TYPE`]. An unknown codec only
/// loses the MP4/Ogg refinement.
#[must_use]
pub fn mime_type_from_names(container: &str, codec: &str) -> &'static str {
    let Some(container) = Container::from_name(container) else {
        log::debug!("mime_type_from_names: unknown container '{container}'");
        return FALLBACK_MIME_TYPE;
    };

    match Codec::from_name(codec) {
        Some(codec) => mime_type(container, codec),
        None => match container {
            Container::Mp4 => "audio/mp4",
            Container::Ogg => "audio/ogg",
            _ => mime_type(container, Codec::Pcm),
        },
    }
}

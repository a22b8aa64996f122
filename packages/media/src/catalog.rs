//! Static codec and container catalog.
//!
//! Clients describe their capabilities with loosely-specified names (`"m4a"`,
//! `"e-ac-3"`, `"musepack7"`, ...). Each [`Codec`] and [`Container`] carries a
//! case-insensitive alias table that resolves those names in both directions.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use strum_macros::{AsRefStr, EnumIter, EnumString};

/// Audio codecs known to the media server.
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
pub enum Codec {
    Aac,
    Ac3,
    Alac,
    Ape,
    Dsd,
    Eac3,
    Flac,
    Mp3,
    Mp4Als,
    Mpc7,
    Mpc8,
    Opus,
    Pcm,
    Shorten,
    TrueAudio,
    Vorbis,
    WavPack,
    Wma1,
    Wma2,
    Wma9Pro,
    Wma9Lossless,
}

/// Audio containers known to the media server.
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
pub enum Container {
    Aiff,
    Ape,
    Asf,
    Dsf,
    Flac,
    Mp4,
    Mpc,
    Mpeg,
    Ogg,
    Shorten,
    TrueAudio,
    Wav,
    WavPack,
}

/// Catalog entry for a [`Codec`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecDesc {
    pub codec: Codec,
    pub name: &'static str,
    pub long_name: &'static str,
    pub is_lossless: bool,
}

/// Describes a codec.
///
/// Total over [`Codec`]: adding a variant without a catalog entry does not
/// compile.
#[must_use]
pub const fn describe(codec: Codec) -> CodecDesc {
    let (name, long_name, is_lossless) = match codec {
        Codec::Aac => ("AAC", "Advanced Audio Coding", false),
        Codec::Ac3 => ("AC3", "Dolby AC-3", false),
        Codec::Alac => ("ALAC", "Apple Lossless Audio Codec", true),
        Codec::Ape => ("APE", "Monkey's Audio", true),
        Codec::Dsd => ("DSD", "Direct Stream Digital", true),
        Codec::Eac3 => ("E-AC3", "Dolby Digital Plus", false),
        Codec::Flac => ("FLAC", "Free Lossless Audio Codec", true),
        Codec::Mp3 => ("MP3", "MPEG-1 Audio Layer III", false),
        Codec::Mp4Als => ("MP4ALS", "MPEG-4 Audio Lossless Coding", true),
        Codec::Mpc7 => ("MPC7", "Musepack7", false),
        Codec::Mpc8 => ("MPC8", "Musepack8", false),
        Codec::Opus => ("Opus", "Opus", false),
        Codec::Pcm => ("PCM", "Pulse-code modulation", true),
        Codec::Shorten => ("Shorten", "Shorten", true),
        Codec::TrueAudio => ("TTA", "The True Audio", true),
        Codec::Vorbis => ("Vorbis", "Vorbis", false),
        Codec::WavPack => ("WavPack", "WavPack", true),
        Codec::Wma1 => ("WMA1", "Windows Media Audio 1", false),
        Codec::Wma2 => ("WMA2", "Windows Media Audio 2", false),
        Codec::Wma9Pro => ("WMA9Pro", "Windows Media Audio 9 Professional", false),
        Codec::Wma9Lossless => ("WMA9Lossless", "Windows Media Audio 9 Lossless", true),
    };

    CodecDesc {
        codec,
        name,
        long_name,
        is_lossless,
    }
}

impl Codec {
    /// Client-facing names that resolve to this codec, lowercase.
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Aac => &["aac", "adts"],
            Self::Ac3 => &["ac3", "ac-3"],
            Self::Alac => &["alac"],
            Self::Ape => &["ape"],
            Self::Dsd => &["dsd"],
            Self::Eac3 => &["eac3", "e-ac3", "e-ac-3", "eac-3"],
            Self::Flac => &["flac"],
            Self::Mp3 => &["mp3"],
            Self::Mp4Als => &["mp4als", "als"],
            Self::Mpc7 => &["mpc7", "musepack7"],
            Self::Mpc8 => &["mpc8", "musepack8"],
            Self::Opus => &["opus"],
            Self::Pcm => &["pcm"],
            Self::Shorten => &["shn", "shorten"],
            Self::TrueAudio => &["tta"],
            Self::Vorbis => &["vorbis"],
            Self::WavPack => &["wv"],
            Self::Wma1 => &["wma1", "wmav1"],
            Self::Wma2 => &["wma2", "wmav2"],
            Self::Wma9Pro => &["wmapro", "wma9pro"],
            Self::Wma9Lossless => &["wmalossless", "wma9lossless"],
        }
    }

    /// Whether `name` is one of this codec's aliases, ignoring ASCII case.
    #[must_use]
    pub fn matches_name(self, name: &str) -> bool {
        self.aliases()
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(name))
    }

    /// Resolves a client-facing codec name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::iter().find(|codec| codec.matches_name(name))
    }

    #[must_use]
    pub const fn is_lossless(self) -> bool {
        describe(self).is_lossless
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        describe(self).name
    }
}

impl Container {
    /// Client-facing names that resolve to this container, lowercase.
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Aiff => &["aif", "aiff"],
            Self::Ape => &["ape"],
            Self::Asf => &["asf", "wma"],
            Self::Dsf => &["dsf"],
            Self::Flac => &["flac"],
            Self::Mp4 => &["aac", "adts", "m4a", "mp4", "m4b", "m4p"],
            Self::Mpc => &["mpc", "mpp", "mp"],
            Self::Mpeg => &["mp3", "mp2", "mpeg"],
            Self::Ogg => &["ogg", "oga"],
            Self::Shorten => &["shn"],
            Self::TrueAudio => &["tta"],
            Self::Wav => &["wav"],
            Self::WavPack => &["wv"],
        }
    }

    /// Whether `name` is one of this container's aliases, ignoring ASCII case.
    #[must_use]
    pub fn matches_name(self, name: &str) -> bool {
        self.aliases()
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(name))
    }

    /// Resolves a client-facing container name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::iter().find(|container| container.matches_name(name))
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aiff => "AIFF",
            Self::Ape => "APE",
            Self::Asf => "ASF",
            Self::Dsf => "DSF",
            Self::Flac => "FLAC",
            Self::Mp4 => "MP4",
            Self::Mpc => "MPC",
            Self::Mpeg => "MPEG",
            Self::Ogg => "Ogg",
            Self::Shorten => "Shorten",
            Self::TrueAudio => "TrueAudio",
            Self::Wav => "WAV",
            Self::WavPack => "WavPack",
        }
    }

    /// Canonical file extension, without the leading dot.
    #[must_use]
    pub const fn file_extension(self) -> &'static str {
        match self {
            Self::Aiff => "aiff",
            Self::Ape => "ape",
            Self::Asf => "wma",
            Self::Dsf => "dsf",
            Self::Flac => "flac",
            Self::Mp4 => "m4a",
            Self::Mpc => "mpc",
            Self::Mpeg => "mp3",
            Self::Ogg => "ogg",
            Self::Shorten => "shn",
            Self::TrueAudio => "tta",
            Self::Wav => "wav",
            Self::WavPack => "wv",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

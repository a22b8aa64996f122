//! Audio media models shared by the streaming decision and transcoding crates.
//!
//! # Main Types
//!
//! * [`Codec`] and [`Container`] - the closed set of audio codecs and containers
//! * [`CodecDesc`] - catalog entry describing a codec, see [`describe`]
//! * [`AudioProperties`] - technical properties of a source audio file
//! * [`TranscodeParameters`] - validated input and output parameters of a transcode

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod catalog;
pub mod mime;
pub mod properties;
pub mod transcode;

pub use catalog::{Codec, CodecDesc, Container, describe};
pub use mime::mime_type;
pub use properties::{AudioProperties, InvalidAudioPropertiesError};
pub use transcode::{
    SUPPORTED_TRANSCODE_OUTPUT_FORMATS, TranscodeInputParameters, TranscodeOutputFormat,
    TranscodeOutputParameters, TranscodeParameters, TranscodeParametersBuilder,
    TranscodeParametersError,
};

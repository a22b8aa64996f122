//! Decides whether a client can play an audio file as-is or needs it
//! transcoded, and to what.
//!
//! # Main Entry Points
//!
//! * [`compute_transcode_decision`] - pure decision from client capabilities
//!   and source properties
//! * [`handle_transcode_decision`] / [`get_transcoding_parameters`] - the
//!   decision and stream request flow, linked by a [`TranscodeDecisionTracker`]
//!   token
//! * [`get_stream_parameters`] - stream requests from clients that only send
//!   a format and a max bitrate

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod audio_file;
pub mod decision;
pub mod limitation;
pub mod payloads;
pub mod stream;
pub mod tracker;

pub use audio_file::{
    AudioFileId, AudioFileInfo, AudioFileStore, AudioPropertiesProvider, ResolveAudioFileError,
    StoredAudioFile, resolve_audio_file_info,
};
pub use decision::{
    TranscodeDecisionResult, TranscodeReason, compute_transcode_decision,
    select_transcode_output_format,
};
pub use payloads::{ClientInfo, StreamDetails, parse_client_info_from_json};
pub use stream::{
    StreamParameters, StreamRequest, StreamRequestError, TranscodeDecisionResponse,
    UserTranscodingSettings, get_stream_parameters, get_transcoding_parameters,
    handle_transcode_decision,
};
pub use tracker::{TranscodeDecisionTracker, get_transcode_decision_tracker};

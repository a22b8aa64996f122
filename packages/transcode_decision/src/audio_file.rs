//! Resolution of a client supplied media identifier to a playable file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use thiserror::Error;
use tonearm_media::AudioProperties;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum AudioFileId {
    Track(u64),
    PodcastEpisode(u64),
}

/// Media type names used by clients.
#[derive(Copy, Clone, Debug, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MediaType {
    Song,
    Podcast,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseAudioFileIdError {
    #[error("Invalid media type '{0}'")]
    InvalidMediaType(String),
    #[error("Invalid media id '{0}'")]
    InvalidMediaId(String),
}

impl AudioFileId {
    /// # Errors
    ///
    /// * If `media_type` is neither `song` nor `podcast`
    /// * If `media_id` is not an unsigned integer
    pub fn from_media_parameters(
        media_type: &str,
        media_id: &str,
    ) -> Result<Self, ParseAudioFileIdError> {
        let media_type = media_type
            .parse::<MediaType>()
            .map_err(|_| ParseAudioFileIdError::InvalidMediaType(media_type.to_string()))?;
        let id = media_id
            .trim()
            .parse::<u64>()
            .map_err(|_| ParseAudioFileIdError::InvalidMediaId(media_id.to_string()))?;

        Ok(match media_type {
            MediaType::Song => Self::Track(id),
            MediaType::Podcast => Self::PodcastEpisode(id),
        })
    }
}

impl std::fmt::Display for AudioFileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Track(id) => write!(f, "track:{id}"),
            Self::PodcastEpisode(id) => write!(f, "podcast:{id}"),
        }
    }
}

/// A playable file with fully known audio properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFileInfo {
    pub path: PathBuf,
    pub audio_properties: AudioProperties,
}

/// What the library knows about a file. Properties may be missing when the
/// file was scanned without them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAudioFile {
    pub path: PathBuf,
    pub audio_properties: Option<AudioProperties>,
}

/// Media library lookup.
pub trait AudioFileStore: Send + Sync {
    fn find_audio_file(&self, id: AudioFileId) -> Option<StoredAudioFile>;
}

/// Reads audio properties straight from a file.
pub trait AudioPropertiesProvider: Send + Sync {
    fn audio_properties(&self, path: &std::path::Path) -> Option<AudioProperties>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveAudioFileError {
    #[error("Audio file {0} not found")]
    NotFound(AudioFileId),
}

/// # Errors
///
/// * If the id is unknown to the store
/// * If the stored entry has no properties and the file cannot be parsed
pub fn resolve_audio_file_info(
    store: &dyn AudioFileStore,
    provider: &dyn AudioPropertiesProvider,
    id: AudioFileId,
) -> Result<AudioFileInfo, ResolveAudioFileError> {
    let Some(stored) = store.find_audio_file(id) else {
        log::debug!("resolve_audio_file_info: {id} unknown");
        return Err(ResolveAudioFileError::NotFound(id));
    };

    let audio_properties = match stored.audio_properties {
        Some(properties) => properties,
        None => {
            log::debug!(
                "resolve_audio_file_info: {id} has no stored properties, reading {}",
                stored.path.display()
            );
            provider
                .audio_properties(&stored.path)
                .ok_or(ResolveAudioFileError::NotFound(id))?
        }
    };

    Ok(AudioFileInfo {
        path: stored.path,
        audio_properties,
    })
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::{collections::HashMap, path::Path};

    use super::*;

    #[derive(Default)]
    pub struct MemoryStore(pub HashMap<AudioFileId, StoredAudioFile>);

    impl AudioFileStore for MemoryStore {
        fn find_audio_file(&self, id: AudioFileId) -> Option<StoredAudioFile> {
            self.0.get(&id).cloned()
        }
    }

    #[derive(Default)]
    pub struct MemoryProvider(pub HashMap<PathBuf, AudioProperties>);

    impl AudioPropertiesProvider for MemoryProvider {
        fn audio_properties(&self, path: &Path) -> Option<AudioProperties> {
            self.0.get(path).cloned()
        }
    }
}

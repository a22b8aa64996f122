//! Short-lived memory of transcode decisions.
//!
//! A decision handed to a client is referenced later by an opaque token when
//! the client opens the stream. Entries expire, and the store is bounded.

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock, Mutex},
    time::{Duration, Instant},
};

use uuid::Uuid;

use crate::{audio_file::AudioFileId, payloads::StreamDetails};

pub const MAX_ENTRY_COUNT: usize = 1000;
pub const ENTRY_MAX_LIFETIME: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedDecision {
    pub added: Instant,
    pub audio_file_id: AudioFileId,
    pub target_stream: StreamDetails,
}

#[derive(Debug)]
pub struct TranscodeDecisionTracker {
    max_entry_count: usize,
    entry_max_lifetime: Duration,
    entries: Mutex<HashMap<Uuid, Arc<TrackedDecision>>>,
}

impl Default for TranscodeDecisionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscodeDecisionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(MAX_ENTRY_COUNT, ENTRY_MAX_LIFETIME)
    }

    #[must_use]
    pub fn with_limits(max_entry_count: usize, entry_max_lifetime: Duration) -> Self {
        Self {
            max_entry_count: max_entry_count.max(1),
            entry_max_lifetime,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Records a decision and returns the token referencing it.
    ///
    /// # Panics
    ///
    /// * If the entries `Mutex` is poisoned
    pub fn add(&self, audio_file_id: AudioFileId, target_stream: StreamDetails) -> Uuid {
        self.add_at(Instant::now(), audio_file_id, target_stream)
    }

    /// # Panics
    ///
    /// * If the entries `Mutex` is poisoned
    pub fn add_at(
        &self,
        now: Instant,
        audio_file_id: AudioFileId,
        target_stream: StreamDetails,
    ) -> Uuid {
        let mut entries = self.entries.lock().unwrap();

        self.purge_expired(&mut entries, now);

        while entries.len() >= self.max_entry_count {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.added)
                .map(|(token, _)| *token)
            else {
                break;
            };
            log::debug!("add_at: evicting decision token={oldest}");
            entries.remove(&oldest);
        }

        let token = Uuid::new_v4();
        entries.insert(
            token,
            Arc::new(TrackedDecision {
                added: now,
                audio_file_id,
                target_stream,
            }),
        );

        log::trace!("add_at: token={token} entries={}", entries.len());

        token
    }

    /// Looks up a decision that has not expired yet.
    ///
    /// # Panics
    ///
    /// * If the entries `Mutex` is poisoned
    #[must_use]
    pub fn get(&self, token: &Uuid) -> Option<Arc<TrackedDecision>> {
        self.get_at(Instant::now(), token)
    }

    /// Looks up a decision as of `now`. An expired entry is removed.
    ///
    /// # Panics
    ///
    /// * If the entries `Mutex` is poisoned
    #[must_use]
    pub fn get_at(&self, now: Instant, token: &Uuid) -> Option<Arc<TrackedDecision>> {
        let mut entries = self.entries.lock().unwrap();

        let entry = entries.get(token)?;
        if self.is_expired(entry, now) {
            log::debug!("get_at: expired decision token={token}");
            entries.remove(token);
            return None;
        }

        Some(entry.clone())
    }

    /// # Panics
    ///
    /// * If the entries `Mutex` is poisoned
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// # Panics
    ///
    /// * If the entries `Mutex` is poisoned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    fn is_expired(&self, entry: &TrackedDecision, now: Instant) -> bool {
        now.saturating_duration_since(entry.added) > self.entry_max_lifetime
    }

    fn purge_expired(&self, entries: &mut HashMap<Uuid, Arc<TrackedDecision>>, now: Instant) {
        entries.retain(|_, entry| !self.is_expired(entry, now));
    }
}

static TRANSCODE_DECISION_TRACKER: LazyLock<TranscodeDecisionTracker> =
    LazyLock::new(TranscodeDecisionTracker::new);

/// Process-wide tracker shared by the decision and streaming endpoints.
#[must_use]
pub fn get_transcode_decision_tracker() -> &'static TranscodeDecisionTracker {
    &TRANSCODE_DECISION_TRACKER
}

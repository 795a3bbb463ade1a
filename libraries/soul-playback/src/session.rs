//! Session persistence
//!
//! A compact snapshot of the queue and transport settings lives under one key
//! in the key-value store. Two write triggers exist:
//!
//! - a debounce deadline, re-armed by every meaningful mutation, which writes
//!   the whole snapshot once mutations stop for the debounce window
//! - a coarser progress timer that, while playing, rewrites only the elapsed
//!   time of the stored snapshot
//!
//! Restoring never starts transport. Any problem while reading the stored
//! snapshot discards it.

use crate::config::SessionSettings;
use crate::error::Result;
use crate::queue::Queue;
use serde::{Deserialize, Serialize};
use soul_core::{KeyValueStore, RepeatMode, TrackId};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Persisted session layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub current_song_id: Option<TrackId>,
    /// Elapsed seconds in the current track
    pub progress: f64,
    pub queue_ids: Vec<TrackId>,
    /// `-1` when nothing is selected
    pub current_index: i64,
    pub volume: f32,
    pub is_shuffling: bool,
    pub repeat_mode: RepeatMode,
}

impl SessionSnapshot {
    /// Project the persisted fields out of live state
    pub fn capture(
        queue: &Queue,
        progress: f64,
        volume: f32,
        is_shuffling: bool,
        repeat_mode: RepeatMode,
    ) -> Self {
        Self {
            current_song_id: queue.current_track().map(|t| t.id.clone()),
            progress: progress.max(0.0),
            queue_ids: queue.ids(),
            current_index: queue.current_index().map_or(-1, |i| i as i64),
            volume,
            is_shuffling,
            repeat_mode,
        }
    }

    /// Stored index as a queue position
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.current_index).ok()
    }
}

/// Debounced snapshot writer and one-shot reader
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    debounce: Duration,
    progress_interval: Duration,
    deadline: Option<Instant>,
    progress_anchor: Option<Instant>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>, settings: &SessionSettings) -> Self {
        Self {
            store,
            key: settings.key.clone(),
            debounce: settings.debounce(),
            progress_interval: settings.progress_interval(),
            deadline: None,
            progress_anchor: None,
        }
    }

    /// Re-arm the debounce deadline
    pub fn request_save(&mut self, now: Instant) {
        self.deadline = Some(now + self.debounce);
    }

    /// Pending debounce deadline
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn save_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Write the full snapshot and clear the pending deadline
    pub fn save_snapshot(&mut self, snapshot: &SessionSnapshot) -> Result<()> {
        self.deadline = None;
        let json = serde_json::to_string(snapshot)?;
        self.store.set(&self.key, &json)?;
        debug!(
            queue_len = snapshot.queue_ids.len(),
            index = snapshot.current_index,
            "Session snapshot saved"
        );
        Ok(())
    }

    /// Whether the periodic progress write is due
    ///
    /// The first call after [`Self::reset_progress_timer`] only starts the
    /// interval.
    pub fn progress_due(&mut self, now: Instant) -> bool {
        match self.progress_anchor {
            None => {
                self.progress_anchor = Some(now);
                false
            }
            Some(anchor) => now.saturating_duration_since(anchor) >= self.progress_interval,
        }
    }

    /// Restart the progress interval (transport started or stopped)
    pub fn reset_progress_timer(&mut self) {
        self.progress_anchor = None;
    }

    /// Rewrite only the elapsed time of the stored snapshot
    pub fn save_progress(&mut self, now: Instant, progress: f64) -> Result<()> {
        self.progress_anchor = Some(now);
        let Some(json) = self.store.get(&self.key)? else {
            return Ok(());
        };
        let mut snapshot: SessionSnapshot = serde_json::from_str(&json)?;
        snapshot.progress = progress.max(0.0);
        self.store.set(&self.key, &serde_json::to_string(&snapshot)?)?;
        debug!(progress, "Session progress saved");
        Ok(())
    }

    /// Read the stored snapshot
    ///
    /// A malformed snapshot is discarded and reported as absent.
    pub fn load(&self) -> Option<SessionSnapshot> {
        let json = match self.store.get(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Could not read session snapshot");
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!(error = %e, "Discarding malformed session snapshot");
                self.discard();
                None
            }
        }
    }

    /// Delete the stored snapshot
    pub fn discard(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            warn!(error = %e, "Could not discard session snapshot");
        }
    }
}

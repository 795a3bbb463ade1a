//! Recently played log
//!
//! Bounded FIFO of played track ids with the time they started. The smart
//! shuffle reads the tail of it to avoid immediate repeats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soul_core::TrackId;
use std::collections::VecDeque;

/// One played track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedEntry {
    pub track_id: TrackId,
    pub played_at: DateTime<Utc>,
}

/// Recently played tracks with bounded size
#[derive(Debug, Clone)]
pub struct HistoryLog {
    /// Oldest first
    entries: VecDeque<PlayedEntry>,
    capacity: usize,
}

impl HistoryLog {
    /// Create new history with specified maximum size
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Rebuild from persisted entries, keeping the newest ones
    pub fn from_entries(capacity: usize, entries: Vec<PlayedEntry>) -> Self {
        let mut log = Self::new(capacity);
        for entry in entries {
            log.push_entry(entry);
        }
        log
    }

    /// Record that a track started now
    pub fn record(&mut self, track_id: TrackId) {
        self.push_entry(PlayedEntry {
            track_id,
            played_at: Utc::now(),
        });
    }

    /// Add an entry, discarding the oldest when full
    pub fn push_entry(&mut self, entry: PlayedEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Ids of the last `n` entries, most recent first
    pub fn recent_ids(&self, n: usize) -> Vec<&TrackId> {
        self.entries.iter().rev().take(n).map(|e| &e.track_id).collect()
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<PlayedEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(50)
    }
}

//! Play queue
//!
//! An ordered list of tracks plus the index of the selected entry. Every edit
//! keeps the index pointing at the same track it pointed at before.

use crate::error::{PlaybackError, Result};
use soul_core::{Track, TrackId};

/// What happened to the selection when an entry was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Another entry was removed; the selection (if any) still holds
    Other,
    /// The selected entry itself was removed; nothing is selected now
    Current,
}

/// Ordered play queue with a current position
#[derive(Debug, Clone, Default)]
pub struct Queue {
    tracks: Vec<Track>,
    current: Option<usize>,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all tracks and select `current`
    pub fn set(&mut self, tracks: Vec<Track>, current: Option<usize>) -> Result<()> {
        if let Some(index) = current {
            if index >= tracks.len() {
                return Err(PlaybackError::IndexOutOfBounds {
                    index,
                    len: tracks.len(),
                });
            }
        }
        self.tracks = tracks;
        self.current = current;
        Ok(())
    }

    /// Add track to the end
    pub fn append(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Insert track right after the current one (or at the front)
    pub fn insert_next(&mut self, track: Track) -> usize {
        let at = self.current.map_or(0, |c| c + 1);
        self.tracks.insert(at, track);
        at
    }

    /// Remove track at `index`
    pub fn remove(&mut self, index: usize) -> Result<(Track, Removal)> {
        self.check(index)?;
        let track = self.tracks.remove(index);

        let removal = match self.current {
            Some(c) if c == index => {
                self.current = None;
                Removal::Current
            }
            Some(c) if index < c => {
                self.current = Some(c - 1);
                Removal::Other
            }
            _ => Removal::Other,
        };

        Ok((track, removal))
    }

    /// Move the track at `from` so it ends up at `to`
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        self.check(from)?;
        self.check(to)?;
        if from == to {
            return Ok(());
        }

        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);

        if let Some(c) = self.current {
            self.current = Some(if c == from {
                to
            } else if from < c && to >= c {
                c - 1
            } else if from > c && to <= c {
                c + 1
            } else {
                c
            });
        }

        Ok(())
    }

    /// Clear entire queue
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = None;
    }

    /// Select an entry
    pub fn select(&mut self, index: usize) -> Result<&Track> {
        self.check(index)?;
        self.current = Some(index);
        Ok(&self.tracks[index])
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|c| self.tracks.get(c))
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// First position of a track id
    pub fn position_of(&self, id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| &t.id == id)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|t| t.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn check(&self, index: usize) -> Result<()> {
        if index < self.tracks.len() {
            Ok(())
        } else {
            Err(PlaybackError::IndexOutOfBounds {
                index,
                len: self.tracks.len(),
            })
        }
    }
}

//! Smart shuffle
//!
//! Picks the next queue index with weighted randomness:
//!
//! 1. Candidates are every entry except the current one and any track played
//!    within the recent window of the history log.
//! 2. With no candidates left, fall back to a uniform pick over everything but
//!    the current entry.
//! 3. Otherwise score each candidate as
//!    `uniform(0,1) + same_artist·w + same_genre·w + liked·w`, keep the
//!    `top_k` highest and pick one of those uniformly.

use crate::config::ShuffleWeights;
use crate::history::HistoryLog;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use soul_core::{Track, TrackId};
use std::collections::HashSet;

/// Weighted next-track selection
#[derive(Debug, Clone, Default)]
pub struct SmartShuffle {
    weights: ShuffleWeights,
}

impl SmartShuffle {
    pub fn new(weights: ShuffleWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ShuffleWeights {
        &self.weights
    }

    /// Select the next index using the thread-local RNG
    pub fn select_next(
        &self,
        queue: &[Track],
        current: Option<usize>,
        history: &HistoryLog,
        liked: &HashSet<TrackId>,
    ) -> Option<usize> {
        self.select_next_with(queue, current, history, liked, &mut thread_rng())
    }

    /// Select the next index with a caller-supplied RNG
    ///
    /// Returns `None` only for an empty queue. A single-entry queue yields
    /// that entry again.
    pub fn select_next_with<R: Rng + ?Sized>(
        &self,
        queue: &[Track],
        current: Option<usize>,
        history: &HistoryLog,
        liked: &HashSet<TrackId>,
        rng: &mut R,
    ) -> Option<usize> {
        if queue.is_empty() {
            return None;
        }

        let recent: HashSet<&TrackId> = history
            .recent_ids(self.weights.recent_window)
            .into_iter()
            .collect();

        let candidates: Vec<usize> = (0..queue.len())
            .filter(|&i| Some(i) != current && !recent.contains(&queue[i].id))
            .collect();

        if candidates.is_empty() {
            let others: Vec<usize> = (0..queue.len()).filter(|&i| Some(i) != current).collect();
            return others.choose(rng).copied().or(Some(0));
        }

        let reference = current.and_then(|c| queue.get(c));
        let mut scored: Vec<(usize, f64)> = candidates
            .into_iter()
            .map(|i| (i, self.score(&queue[i], reference, liked, rng)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.weights.top_k.max(1));

        scored.choose(rng).map(|(i, _)| *i)
    }

    fn score<R: Rng + ?Sized>(
        &self,
        candidate: &Track,
        reference: Option<&Track>,
        liked: &HashSet<TrackId>,
        rng: &mut R,
    ) -> f64 {
        let mut score: f64 = rng.gen();

        if let Some(reference) = reference {
            if candidate.artist == reference.artist {
                score += self.weights.same_artist;
            }
            if candidate.same_genre(reference) {
                score += self.weights.same_genre;
            }
        }
        if liked.contains(&candidate.id) {
            score += self.weights.liked;
        }

        score
    }
}

//! Property-based tests for queue editing and smart shuffle
//!
//! Uses proptest to verify invariants across many random inputs.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use soul_core::{Track, TrackId};
use soul_playback::{HistoryLog, Queue, Removal, ShuffleWeights, SmartShuffle};
use std::collections::HashSet;

// ===== Helpers =====

fn arbitrary_track() -> impl Strategy<Value = Track> {
    (
        "[A-Za-z ]{1,20}",                           // artist
        proptest::option::of("(rock|jazz|ambient)"), // genre
        1u32..600,                                   // duration (seconds)
    )
        .prop_map(|(artist, genre, duration)| {
            let track =
                Track::new("placeholder", "Title", artist).with_duration(f64::from(duration));
            match genre {
                Some(genre) => track.with_genre(genre),
                None => track,
            }
        })
}

/// Tracks with unique ids
fn arbitrary_tracks(max: usize) -> impl Strategy<Value = Vec<Track>> {
    prop::collection::vec(arbitrary_track(), 1..max).prop_map(|tracks| {
        tracks
            .into_iter()
            .enumerate()
            .map(|(i, mut track)| {
                track.id = TrackId::new(format!("t{i}"));
                track
            })
            .collect()
    })
}

#[derive(Debug, Clone)]
enum Edit {
    Append,
    InsertNext,
    Remove(usize),
    Reorder(usize, usize),
}

fn arbitrary_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        Just(Edit::Append),
        Just(Edit::InsertNext),
        (0usize..64).prop_map(Edit::Remove),
        (0usize..64, 0usize..64).prop_map(|(from, to)| Edit::Reorder(from, to)),
    ]
}

// ===== Queue =====

proptest! {
    /// The current index keeps pointing at the same track through edits
    #[test]
    fn prop_current_follows_track(
        tracks in arbitrary_tracks(30),
        start in 0usize..30,
        edits in prop::collection::vec(arbitrary_edit(), 0..40),
    ) {
        let start = start % tracks.len();
        let mut queue = Queue::new();
        queue.set(tracks, Some(start)).unwrap();
        let mut current_id = queue.current_track().map(|t| t.id.clone());
        let mut next_id = 1000;

        for edit in edits {
            let len = queue.len();
            match edit {
                Edit::Append => {
                    queue.append(Track::new(format!("n{next_id}"), "New", "New"));
                    next_id += 1;
                }
                Edit::InsertNext => {
                    queue.insert_next(Track::new(format!("n{next_id}"), "New", "New"));
                    next_id += 1;
                }
                Edit::Remove(i) if len > 0 => {
                    let (_, removal) = queue.remove(i % len).unwrap();
                    if removal == Removal::Current {
                        current_id = None;
                    }
                }
                Edit::Reorder(from, to) if len > 0 => {
                    queue.reorder(from % len, to % len).unwrap();
                }
                _ => {}
            }

            prop_assert_eq!(queue.current_track().map(|t| t.id.clone()), current_id.clone());
            if let Some(index) = queue.current_index() {
                prop_assert!(index < queue.len());
            }
        }
    }

    /// Reordering never adds or loses tracks
    #[test]
    fn prop_reorder_preserves_tracks(
        tracks in arbitrary_tracks(30),
        moves in prop::collection::vec((0usize..30, 0usize..30), 1..20),
    ) {
        let mut queue = Queue::new();
        let before: HashSet<TrackId> = tracks.iter().map(|t| t.id.clone()).collect();
        let len = tracks.len();
        queue.set(tracks, None).unwrap();

        for (from, to) in moves {
            queue.reorder(from % len, to % len).unwrap();
        }

        let after: HashSet<TrackId> = queue.ids().into_iter().collect();
        prop_assert_eq!(queue.len(), len);
        prop_assert_eq!(before, after);
    }

    /// Out-of-range edits are rejected without changing the queue
    #[test]
    fn prop_out_of_range_is_rejected(tracks in arbitrary_tracks(10), extra in 0usize..5) {
        let mut queue = Queue::new();
        let len = tracks.len();
        queue.set(tracks, Some(0)).unwrap();

        prop_assert!(queue.remove(len + extra).is_err());
        prop_assert!(queue.reorder(0, len + extra).is_err());
        prop_assert!(queue.select(len + extra).is_err());
        prop_assert_eq!(queue.len(), len);
        prop_assert_eq!(queue.current_index(), Some(0));
    }
}

// ===== Smart shuffle =====

proptest! {
    /// Never picks the current index when anything else exists, and never a
    /// recently played track while an unplayed one is available
    #[test]
    fn prop_shuffle_respects_exclusions(
        tracks in arbitrary_tracks(40),
        current in 0usize..40,
        played in prop::collection::vec(0usize..40, 0..15),
        liked in prop::collection::vec(0usize..40, 0..10),
        seed in any::<u64>(),
    ) {
        let current = current % tracks.len();
        let shuffle = SmartShuffle::default();
        let window = shuffle.weights().recent_window;

        let mut history = HistoryLog::new(50);
        for i in &played {
            history.record(tracks[i % tracks.len()].id.clone());
        }
        let liked: HashSet<TrackId> = liked
            .iter()
            .map(|i| tracks[i % tracks.len()].id.clone())
            .collect();

        let mut rng = StdRng::seed_from_u64(seed);
        let pick = shuffle
            .select_next_with(&tracks, Some(current), &history, &liked, &mut rng)
            .unwrap();

        prop_assert!(pick < tracks.len());
        if tracks.len() > 1 {
            prop_assert_ne!(pick, current);
        }

        let recent: HashSet<&TrackId> = history.recent_ids(window).into_iter().collect();
        let fresh_exists = tracks
            .iter()
            .enumerate()
            .any(|(i, t)| i != current && !recent.contains(&t.id));
        if fresh_exists {
            prop_assert!(!recent.contains(&tracks[pick].id));
        }
    }

    /// With a single-slot pick, an overwhelming artist bonus always wins
    #[test]
    fn prop_bonuses_dominate_without_noise(seed in any::<u64>()) {
        let weights = ShuffleWeights {
            top_k: 1,
            same_artist: 10.0,
            ..ShuffleWeights::default()
        };
        let shuffle = SmartShuffle::new(weights);

        let tracks = vec![
            Track::new("current", "Now", "Artist A"),
            Track::new("other", "Other", "Artist B"),
            Track::new("same", "Same", "Artist A"),
            Track::new("another", "Another", "Artist C"),
        ];

        let mut rng = StdRng::seed_from_u64(seed);
        let pick = shuffle
            .select_next_with(&tracks, Some(0), &HistoryLog::default(), &HashSet::new(), &mut rng)
            .unwrap();
        prop_assert_eq!(pick, 2);
    }

    /// Ten chained picks over a varied queue, each fed back into history,
    /// never repeat back to back and never reuse a recent track early
    #[test]
    fn prop_chained_picks_avoid_recent(
        liked in prop::collection::vec(0usize..14, 0..5),
        seed in any::<u64>(),
    ) {
        let artists = ["Artist A", "Artist B", "Artist C", "Artist D", "Artist E"];
        let genres = ["rock", "jazz", "ambient"];
        let tracks: Vec<Track> = (0..14)
            .map(|i| {
                Track::new(format!("t{i}"), format!("Title {i}"), artists[i % artists.len()])
                    .with_genre(genres[i % genres.len()])
            })
            .collect();
        let liked: HashSet<TrackId> = liked.iter().map(|&i| tracks[i].id.clone()).collect();

        let shuffle = SmartShuffle::default();
        let window = shuffle.weights().recent_window;
        let mut history = HistoryLog::new(50);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut current = 0;
        history.record(tracks[current].id.clone());

        for _ in 0..10 {
            let recent: HashSet<TrackId> =
                history.recent_ids(window).into_iter().cloned().collect();
            let fresh_exists = tracks
                .iter()
                .enumerate()
                .any(|(i, t)| i != current && !recent.contains(&t.id));

            let pick = shuffle
                .select_next_with(&tracks, Some(current), &history, &liked, &mut rng)
                .unwrap();

            prop_assert_ne!(pick, current);
            if fresh_exists {
                prop_assert!(!recent.contains(&tracks[pick].id));
            }

            history.record(tracks[pick].id.clone());
            current = pick;
        }
    }
}

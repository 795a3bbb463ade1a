//! Library cache
//!
//! In-memory projection of the catalog: playable tracks by id plus album
//! groupings. Session restore and sync lookups go through it.

use soul_core::{Album, AlbumId, CatalogClient, Track, TrackId};
use std::collections::HashMap;
use tracing::{debug, info};

/// Cached catalog contents
#[derive(Debug, Clone, Default)]
pub struct LibraryCache {
    tracks: Vec<Track>,
    by_id: HashMap<TrackId, usize>,
    albums: Vec<Album>,
}

impl LibraryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from known tracks, deriving album groupings
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let mut cache = Self::default();
        cache.replace(tracks, Vec::new());
        cache
    }

    /// Reload everything from the catalog
    ///
    /// On error the previous contents are kept.
    pub async fn refresh(&mut self, catalog: &dyn CatalogClient) -> soul_core::Result<usize> {
        let tracks = catalog.list_tracks().await?;
        let albums = catalog.list_albums().await?;
        self.replace(tracks, albums);
        info!(
            tracks = self.tracks.len(),
            albums = self.albums.len(),
            "Library cache refreshed"
        );
        Ok(self.tracks.len())
    }

    fn replace(&mut self, tracks: Vec<Track>, albums: Vec<Album>) {
        self.by_id = tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        self.albums = if albums.is_empty() {
            derive_albums(&tracks)
        } else {
            albums
        };
        self.tracks = tracks;
    }

    pub fn get(&self, id: &TrackId) -> Option<&Track> {
        self.by_id.get(id).map(|&i| &self.tracks[i])
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    /// Map ids back to tracks, dropping ids no longer in the library
    pub fn resolve_ids(&self, ids: &[TrackId]) -> Vec<Track> {
        let resolved: Vec<Track> = ids.iter().filter_map(|id| self.get(id).cloned()).collect();
        if resolved.len() != ids.len() {
            debug!(
                requested = ids.len(),
                resolved = resolved.len(),
                "Dropped unknown track ids"
            );
        }
        resolved
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Group tracks by (album, artist) in first-seen order
fn derive_albums(tracks: &[Track]) -> Vec<Album> {
    let mut albums: Vec<Album> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for track in tracks {
        let Some(title) = &track.album else { continue };
        let key = (title.to_lowercase(), track.artist.to_lowercase());

        let slot = *index.entry(key).or_insert_with(|| {
            albums.push(Album {
                id: AlbumId::new(format!("{}::{}", track.artist, title)),
                title: title.clone(),
                artist: track.artist.clone(),
                artwork: track.artwork.clone(),
                track_ids: Vec::new(),
            });
            albums.len() - 1
        });

        let album = &mut albums[slot];
        album.track_ids.push(track.id.clone());
        if album.artwork.is_none() {
            album.artwork.clone_from(&track.artwork);
        }
    }

    albums
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> LibraryCache {
        LibraryCache::from_tracks(vec![
            Track::new("a", "A", "Band").with_album("First"),
            Track::new("b", "B", "Band").with_album("first"),
            Track::new("c", "C", "Solo").with_album("First"),
            Track::new("d", "D", "Solo"),
        ])
    }

    #[test]
    fn lookup_by_id() {
        let cache = library();
        assert_eq!(cache.get(&TrackId::new("c")).unwrap().title, "C");
        assert!(cache.get(&TrackId::new("zz")).is_none());
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn resolve_drops_unknown_ids() {
        let cache = library();
        let ids = [TrackId::new("b"), TrackId::new("gone"), TrackId::new("a")];
        let resolved: Vec<_> = cache
            .resolve_ids(&ids)
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(resolved, vec![TrackId::new("b"), TrackId::new("a")]);
    }

    #[test]
    fn albums_derived_by_title_and_artist() {
        let cache = library();
        let albums = cache.albums();
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].artist, "Band");
        assert_eq!(albums[0].track_ids, vec![TrackId::new("a"), TrackId::new("b")]);
        assert_eq!(albums[1].artist, "Solo");
    }
}

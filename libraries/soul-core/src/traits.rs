/// Collaborator traits for Soul Player
use crate::error::Result;
use crate::types::{Album, SignedUrl, Track};
use async_trait::async_trait;

/// Library catalog API
///
/// Implementers expose the music library and turn indirect source
/// references into short-lived playable URLs. The playback engine only
/// calls `resolve_source` lazily, when a queued track is about to load.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// List every playable track in the library
    async fn list_tracks(&self) -> Result<Vec<Track>>;

    /// List album groupings
    ///
    /// An empty list means the catalog does not group tracks; callers derive
    /// groupings from track metadata instead.
    async fn list_albums(&self) -> Result<Vec<Album>>;

    /// Resolve an indirect source key into a short-lived signed URL
    ///
    /// # Errors
    /// Any non-success answer from the catalog is an error; the engine treats
    /// it as a load failure for that attempt.
    async fn resolve_source(&self, key: &str) -> Result<SignedUrl>;
}

/// Durable string key-value storage
///
/// Used for the session snapshot and the independently persisted
/// preferences. Values are opaque strings (the engine stores JSON).
///
/// Calls are synchronous: the engine writes from its single control task and
/// expects each call to be a short, local operation.
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value (no-op when absent)
    fn remove(&self, key: &str) -> Result<()>;
}

mod album;
mod equalizer;
mod ids;
mod playback_state;
mod track;

pub use album::{Album, AlbumId};
pub use equalizer::EqualizerSettings;
pub use ids::TrackId;
pub use playback_state::RepeatMode;
pub use track::{SignedUrl, SourceRef, Track};

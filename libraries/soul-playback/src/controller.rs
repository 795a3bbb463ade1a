//! Playback controller
//!
//! Single owner of the queue, the transport state and the one live sound
//! instance. Every mutation happens on the engine task; asynchronous work
//! (source resolution, sound loading) reports back as [`EngineEvent`]s tagged
//! with the load generation that started it.
//!
//! # State machine
//!
//! ```text
//! Idle -> Loading -> Playing <-> Paused -> Ended
//!           |           |          |
//!           +-----------+----------+--> Error (next successful load leaves it)
//! ```

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::graph::AudioGraphManager;
use crate::history::HistoryLog;
use crate::library::LibraryCache;
use crate::preferences::Preferences;
use crate::queue::{Queue, Removal};
use crate::session::{SessionSnapshot, SessionStore};
use crate::shuffle::SmartShuffle;
use crate::sound::{
    EngineEvent, OutputContext, SoundEvent, SoundEventSender, SoundFactory, SoundInstance,
    SoundRequest,
};
use crate::sync::{SyncChannel, SyncEnvelope, SyncEvent, SyncTransport};
use crate::types::{PlaybackSnapshot, TransportStatus};
use crate::volume::{FadeRamp, Volume};
use soul_core::{
    CatalogClient, EqualizerSettings, KeyValueStore, RepeatMode, SourceRef, Track, TrackId,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// External collaborators injected into the engine
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogClient>,
    pub store: Arc<dyn KeyValueStore>,
    pub sounds: Arc<dyn SoundFactory>,
    pub output: Arc<dyn OutputContext>,
    /// `None` runs the engine without a sync room
    pub sync: Option<Arc<dyn SyncTransport>>,
}

/// What to do once a load completes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadIntent {
    /// Start transport once loaded
    pub autoplay: bool,
    /// Seek here once loaded (seconds)
    pub start_at: f64,
    /// Session restore: stay silent, never surface errors
    pub restore: bool,
}

impl LoadIntent {
    /// Regular user-driven load
    pub fn play() -> Self {
        Self {
            autoplay: true,
            start_at: 0.0,
            restore: false,
        }
    }

    /// Rehydration of a stored session
    pub fn restore(start_at: f64) -> Self {
        Self {
            autoplay: false,
            start_at,
            restore: true,
        }
    }
}

struct PendingLoad {
    intent: LoadIntent,
    resolver: Option<JoinHandle<()>>,
}

/// The playback state machine
pub struct PlaybackController {
    config: PlaybackConfig,
    catalog: Arc<dyn CatalogClient>,
    sounds: Arc<dyn SoundFactory>,
    graph: AudioGraphManager,
    session: SessionStore,
    prefs: Preferences,
    sync: Option<SyncChannel>,
    library: LibraryCache,
    shuffle: SmartShuffle,
    history: HistoryLog,
    liked: HashSet<TrackId>,

    queue: Queue,
    status: TransportStatus,
    elapsed: f64,
    duration: f64,
    volume: Volume,
    shuffle_enabled: bool,
    repeat: RepeatMode,
    error: Option<String>,

    sound: Option<Box<dyn SoundInstance>>,
    generation: u64,
    pending: Option<PendingLoad>,
    fade: Option<FadeRamp>,
    recorded_generation: Option<u64>,

    events_tx: mpsc::UnboundedSender<EngineEvent>,
    pending_events: Vec<PlaybackEvent>,
}

impl PlaybackController {
    /// Create a controller and the receiver for its internal events
    ///
    /// Stored preferences (volume, shuffle, repeat, equalizer, liked tracks,
    /// recently played) are loaded here.
    pub fn new(
        config: PlaybackConfig,
        parts: Collaborators,
        library: LibraryCache,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let prefs = Preferences::new(Arc::clone(&parts.store));
        let stored = prefs.load();

        let mut graph = AudioGraphManager::new(config.graph.clone(), parts.output);
        if let Some(settings) = stored.equalizer {
            graph.apply_equalizer(settings);
        }

        let controller = Self {
            catalog: parts.catalog,
            sounds: parts.sounds,
            graph,
            session: SessionStore::new(parts.store, &config.session),
            prefs,
            sync: parts
                .sync
                .map(|transport| SyncChannel::new(transport, config.sync.room.clone())),
            library,
            shuffle: SmartShuffle::new(config.shuffle.clone()),
            history: HistoryLog::from_entries(config.history_capacity, stored.recently_played),
            liked: stored.liked,

            queue: Queue::new(),
            status: TransportStatus::Idle,
            elapsed: 0.0,
            duration: 0.0,
            volume: Volume::new(stored.volume.unwrap_or(1.0)),
            shuffle_enabled: stored.shuffle.unwrap_or(false),
            repeat: stored.repeat.unwrap_or_default(),
            error: None,

            sound: None,
            generation: 0,
            pending: None,
            fade: None,
            recorded_generation: None,

            events_tx,
            pending_events: Vec::new(),
            config,
        };

        (controller, events_rx)
    }

    /// Build the audio graph (once)
    pub fn build_graph(&mut self) -> bool {
        self.graph.build()
    }

    /// Join the sync room, returning the stream of remote events
    pub fn connect_sync(&mut self) -> Option<mpsc::UnboundedReceiver<SyncEnvelope>> {
        let sync = self.sync.as_mut()?;
        match sync.connect() {
            Ok(rx) => Some(rx),
            Err(e) => {
                warn!(error = %e, "Could not join sync room");
                None
            }
        }
    }

    /// Ask peers for their state (late-join handshake)
    pub fn request_remote_state(&self) {
        if self.config.sync.request_state_on_join {
            if let Some(sync) = &self.sync {
                sync.request_state();
            }
        }
    }

    // ===== Loading =====

    /// Replace the queue and start playing `queue[index]`
    pub fn load_and_play(&mut self, index: usize, queue: Vec<Track>) -> Result<()> {
        if index >= queue.len() {
            return Err(PlaybackError::IndexOutOfBounds {
                index,
                len: queue.len(),
            });
        }
        self.queue.set(queue, None)?;
        self.emit(PlaybackEvent::QueueChanged {
            len: self.queue.len(),
        });
        self.begin_load(index, LoadIntent::play());
        Ok(())
    }

    /// Start playing an entry of the current queue
    pub fn play_index(&mut self, index: usize) -> Result<()> {
        if index >= self.queue.len() {
            return Err(PlaybackError::IndexOutOfBounds {
                index,
                len: self.queue.len(),
            });
        }
        self.begin_load(index, LoadIntent::play());
        Ok(())
    }

    /// Tear down the current sound and start loading `index`
    fn begin_load(&mut self, index: usize, intent: LoadIntent) {
        self.teardown_sound();
        let generation = self.generation;

        let track = match self.queue.select(index) {
            Ok(track) => track.clone(),
            Err(e) => {
                warn!(error = %e, "Cannot load queue entry");
                return;
            }
        };

        info!(
            track_id = %track.id,
            index,
            generation,
            restore = intent.restore,
            "Loading track"
        );

        self.elapsed = 0.0;
        self.duration = track.duration;
        self.set_status(TransportStatus::Loading);
        self.emit(PlaybackEvent::TrackChanged {
            index: Some(index),
            track: Some(track.clone()),
        });

        if !intent.restore {
            self.publish(SyncEvent::ChangeTrack {
                track: track.clone(),
            });
            self.request_save();
        }

        match &track.source {
            SourceRef::Direct { url } => {
                self.pending = Some(PendingLoad {
                    intent,
                    resolver: None,
                });
                self.open_sound(generation, track.id.clone(), url.clone());
            }
            SourceRef::Indirect { key } => {
                let catalog = Arc::clone(&self.catalog);
                let tx = self.events_tx.clone();
                let key = key.clone();

                let resolver = tokio::spawn(async move {
                    let result = catalog
                        .resolve_source(&key)
                        .await
                        .map(|signed| signed.url)
                        .map_err(|e| e.to_string());
                    let _ = tx.send(EngineEvent::SourceResolved { generation, result });
                });

                self.pending = Some(PendingLoad {
                    intent,
                    resolver: Some(resolver),
                });
            }
        }
    }

    fn open_sound(&mut self, generation: u64, track_id: TrackId, url: String) {
        let request = SoundRequest {
            track_id: track_id.clone(),
            url,
            volume: 0.0,
            events: SoundEventSender::new(generation, self.events_tx.clone()),
        };

        match self.sounds.create(request) {
            Ok(sound) => {
                debug!(track_id = %track_id, generation, "Sound instance created");
                self.sound = Some(sound);
            }
            Err(e) => self.fail(PlaybackError::Load {
                track_id,
                message: e.to_string(),
            }),
        }
    }

    /// Stop and release the live sound, cancel any in-flight load
    ///
    /// Bumps the generation so late events from the old instance are dropped.
    fn teardown_sound(&mut self) {
        self.generation += 1;

        if let Some(pending) = self.pending.take() {
            if let Some(resolver) = pending.resolver {
                resolver.abort();
                debug!("Aborted in-flight source resolution");
            }
        }

        if let Some(mut sound) = self.sound.take() {
            sound.stop();
            sound.unload();
            debug!("Sound instance released");
        }

        self.fade = None;
    }

    /// Route an internal event to the current load
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::SourceResolved { generation, result } => {
                if generation != self.generation || self.pending.is_none() {
                    debug!(generation, current = self.generation, "Dropping stale resolution");
                    return;
                }
                if let Some(pending) = self.pending.as_mut() {
                    pending.resolver = None;
                }
                let Some(track_id) = self.queue.current_track().map(|t| t.id.clone()) else {
                    return;
                };

                match result {
                    Ok(url) => self.open_sound(generation, track_id, url),
                    Err(message) => self.fail(PlaybackError::Resolution { track_id, message }),
                }
            }
            EngineEvent::Sound { generation, event } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "Dropping stale sound event");
                    return;
                }
                match event {
                    SoundEvent::Loaded { duration } => self.on_loaded(duration),
                    SoundEvent::Started => debug!(generation, "Sound started"),
                    SoundEvent::Ended => self.on_track_end(),
                    SoundEvent::Errored(message) => {
                        let Some(track_id) = self.queue.current_track().map(|t| t.id.clone())
                        else {
                            debug!(generation, "Sound error with no current track");
                            return;
                        };
                        self.fail(PlaybackError::Load { track_id, message });
                    }
                }
            }
        }
    }

    fn on_loaded(&mut self, duration: f64) {
        let Some(pending) = self.pending.take() else {
            debug!("Ignoring duplicate load notification");
            return;
        };
        let intent = pending.intent;

        if duration.is_finite() && duration > 0.0 {
            self.duration = duration;
            self.emit(PlaybackEvent::DurationChanged { duration });
        }

        if self.error.take().is_some() {
            self.emit(PlaybackEvent::ErrorCleared);
        }

        if intent.start_at > 0.0 {
            let at = self.clamp_time(intent.start_at);
            if let Some(sound) = self.sound.as_mut() {
                sound.seek(at);
            }
            self.elapsed = at;
        }

        if intent.restore {
            if let Some(sound) = self.sound.as_mut() {
                sound.set_volume(self.volume.level());
            }
            if let Some(index) = self.queue.current_index() {
                self.emit(PlaybackEvent::SessionRestored { index });
            }
            if intent.autoplay {
                self.start_playback(false);
            } else {
                self.set_status(TransportStatus::Paused);
            }
            return;
        }

        if intent.autoplay {
            self.start_playback(true);
        } else {
            let gain = self.volume.level();
            if let Some(sound) = self.sound.as_mut() {
                sound.set_volume(gain);
            }
            self.set_status(TransportStatus::Paused);
        }
    }

    /// Run the loaded sound, optionally fading in from silence
    fn start_playback(&mut self, fade_in: bool) -> bool {
        if self.sound.is_none() {
            return false;
        }
        if let Err(e) = self.graph.ensure_output_running() {
            self.report_error(e);
            self.set_status(TransportStatus::Paused);
            return false;
        }

        let fade = self.config.fade_in();
        let gain = self.volume.level();
        let Some(sound) = self.sound.as_mut() else {
            return false;
        };

        if fade_in && !fade.is_zero() {
            sound.set_volume(0.0);
            self.fade = Some(FadeRamp::new(Instant::now(), fade));
        } else {
            sound.set_volume(gain);
        }

        match sound.play() {
            Ok(()) => {
                self.set_status(TransportStatus::Playing);
                self.session.reset_progress_timer();
                self.record_history();
                true
            }
            Err(e) => {
                self.fade = None;
                warn!(error = %e, "Sound refused to play");
                self.report_error(PlaybackError::Play(e.to_string()));
                self.set_status(TransportStatus::Paused);
                false
            }
        }
    }

    fn record_history(&mut self) {
        if self.recorded_generation == Some(self.generation) {
            return;
        }
        self.recorded_generation = Some(self.generation);

        if let Some(track) = self.queue.current_track() {
            self.history.record(track.id.clone());
            if let Err(e) = self.prefs.set_recently_played(&self.history.entries()) {
                warn!(error = %e, "Could not persist recently played");
            }
        }
    }

    /// Handle a failed load or playback
    ///
    /// Restore failures silently discard the stored session.
    fn fail(&mut self, err: PlaybackError) {
        let restoring = self.pending.as_ref().is_some_and(|p| p.intent.restore);
        self.teardown_sound();

        if restoring {
            debug!(error = %err, "Discarding session that failed to restore");
            self.session.discard();
            self.queue.clear();
            self.elapsed = 0.0;
            self.duration = 0.0;
            self.set_status(TransportStatus::Idle);
            self.emit(PlaybackEvent::TrackChanged {
                index: None,
                track: None,
            });
            self.emit(PlaybackEvent::QueueChanged { len: 0 });
            return;
        }

        warn!(error = %err, "Playback failed");
        self.report_error(err);
        self.set_status(TransportStatus::Error);
    }

    fn report_error(&mut self, err: PlaybackError) {
        let message = err.to_string();
        self.error = Some(message.clone());
        self.emit(PlaybackEvent::Error { message });
    }

    // ===== Transport =====

    /// Start or resume playback
    pub fn play(&mut self) {
        if self.queue.is_empty() {
            debug!("Play ignored: queue is empty");
            return;
        }

        match self.status {
            TransportStatus::Playing => {}
            TransportStatus::Loading => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.intent.autoplay = true;
                }
                self.publish(SyncEvent::Play);
            }
            TransportStatus::Idle | TransportStatus::Error => {
                let index = self.queue.current_index().unwrap_or(0);
                self.begin_load(index, LoadIntent::play());
            }
            TransportStatus::Paused | TransportStatus::Ended => {
                if self.status == TransportStatus::Ended {
                    if let Some(sound) = self.sound.as_mut() {
                        sound.seek(0.0);
                    }
                    self.elapsed = 0.0;
                }
                if self.start_playback(false) {
                    self.publish(SyncEvent::Play);
                    self.request_save();
                }
            }
        }
    }

    /// Pause playback (no-op when nothing is loaded)
    pub fn pause(&mut self) {
        match self.status {
            TransportStatus::Playing => {
                self.refresh_position();
                let gain = self.volume.level();
                if let Some(sound) = self.sound.as_mut() {
                    sound.pause();
                    if self.fade.take().is_some() {
                        sound.set_volume(gain);
                    }
                }
                self.set_status(TransportStatus::Paused);
                self.session.reset_progress_timer();
                self.publish(SyncEvent::Pause);
                self.request_save();
            }
            TransportStatus::Loading => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.intent.autoplay = false;
                }
                self.publish(SyncEvent::Pause);
            }
            _ => debug!(status = ?self.status, "Pause ignored"),
        }
    }

    /// Jump to an absolute position (seconds)
    pub fn seek(&mut self, time: f64) {
        if !time.is_finite() {
            return;
        }
        let time = self.clamp_time(time);

        match self.status {
            TransportStatus::Loading => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.intent.start_at = time;
                }
            }
            status if status.has_sound() => {
                if let Some(sound) = self.sound.as_mut() {
                    sound.seek(time);
                }
                if status == TransportStatus::Ended {
                    self.set_status(TransportStatus::Paused);
                }
            }
            _ => {
                debug!("Seek ignored: nothing loaded");
                return;
            }
        }

        self.elapsed = time;
        self.emit(PlaybackEvent::PositionUpdate {
            elapsed: self.elapsed,
            duration: self.duration,
        });
        self.publish(SyncEvent::Seek { time });
        self.request_save();
    }

    fn clamp_time(&self, time: f64) -> f64 {
        if self.duration > 0.0 {
            time.clamp(0.0, self.duration)
        } else {
            time.max(0.0)
        }
    }

    /// Skip forward, honoring shuffle and repeat
    pub fn next(&mut self) {
        if self.queue.is_empty() {
            debug!("Next ignored: queue is empty");
            return;
        }

        if self.repeat == RepeatMode::One {
            if let Some(current) = self.queue.current_index() {
                self.begin_load(current, LoadIntent::play());
                return;
            }
        }

        self.advance();
    }

    /// Restart the current track, or go back one entry (wrapping)
    pub fn prev(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        self.refresh_position();
        let threshold = self.config.restart_threshold().as_secs_f64();
        if self.status.has_sound() && self.elapsed > threshold {
            debug!(elapsed = self.elapsed, "Restarting current track");
            self.seek(0.0);
            return;
        }

        let len = self.queue.len();
        let target = match self.queue.current_index() {
            Some(0) | None => len - 1,
            Some(current) => current - 1,
        };
        self.begin_load(target, LoadIntent::play());
    }

    fn on_track_end(&mut self) {
        debug!(track_id = ?self.queue.current_track().map(|t| &t.id), "Track ended");
        self.fade = None;

        if self.repeat == RepeatMode::One {
            if let Some(current) = self.queue.current_index() {
                self.begin_load(current, LoadIntent::play());
                return;
            }
        }

        self.advance();
    }

    /// Pick the following entry, or stop at the end of the queue
    fn advance(&mut self) {
        let len = self.queue.len();
        let current = self.queue.current_index();

        if self.shuffle_enabled {
            let pick = self.shuffle.select_next(
                self.queue.tracks(),
                current,
                &self.history,
                &self.liked,
            );
            if let Some(index) = pick {
                self.begin_load(index, LoadIntent::play());
            }
            return;
        }

        match current {
            None => self.begin_load(0, LoadIntent::play()),
            Some(c) if c + 1 < len => self.begin_load(c + 1, LoadIntent::play()),
            Some(_) if self.repeat == RepeatMode::All => self.begin_load(0, LoadIntent::play()),
            Some(_) => self.stop_at_end(),
        }
    }

    /// Stop transport, rewind, keep the last track loaded
    fn stop_at_end(&mut self) {
        info!("Reached end of queue");
        if let Some(pending) = self.pending.as_mut() {
            pending.intent.autoplay = false;
        }
        let gain = self.volume.level();
        if let Some(sound) = self.sound.as_mut() {
            sound.pause();
            sound.seek(0.0);
            sound.set_volume(gain);
        }
        self.fade = None;
        self.elapsed = 0.0;
        self.session.reset_progress_timer();
        if self.pending.is_none() {
            self.set_status(TransportStatus::Ended);
        }
        self.emit(PlaybackEvent::PositionUpdate {
            elapsed: 0.0,
            duration: self.duration,
        });
        self.request_save();
    }

    // ===== Settings =====

    /// Set output volume (0.0-1.0) and store the preference
    pub fn set_volume(&mut self, volume: f32) {
        self.volume.set_level(volume);
        let level = self.volume.level();

        // Loading sounds stay muted and fades pick the new target up on tick
        if self.pending.is_none() && self.fade.is_none() {
            let gain = self.volume.level();
            if let Some(sound) = self.sound.as_mut() {
                sound.set_volume(gain);
            }
        }

        if let Err(e) = self.prefs.set_volume(level) {
            warn!(error = %e, "Could not persist volume");
        }
        self.emit(PlaybackEvent::VolumeChanged { volume: level });
        self.request_save();
    }

    pub fn toggle_shuffle(&mut self) {
        self.shuffle_enabled = !self.shuffle_enabled;
        if let Err(e) = self.prefs.set_shuffle(self.shuffle_enabled) {
            warn!(error = %e, "Could not persist shuffle");
        }
        self.emit(PlaybackEvent::ShuffleChanged {
            enabled: self.shuffle_enabled,
        });
        self.request_save();
    }

    /// `off -> all -> one -> off`
    pub fn cycle_repeat(&mut self) {
        self.repeat = self.repeat.cycle();
        if let Err(e) = self.prefs.set_repeat(self.repeat) {
            warn!(error = %e, "Could not persist repeat mode");
        }
        self.emit(PlaybackEvent::RepeatChanged { mode: self.repeat });
        self.request_save();
    }

    pub fn apply_equalizer(&mut self, settings: EqualizerSettings) {
        self.graph.apply_equalizer(settings);
        if let Err(e) = self.prefs.set_equalizer(&settings) {
            warn!(error = %e, "Could not persist equalizer");
        }
        self.emit(PlaybackEvent::EqualizerChanged { settings });
    }

    /// Flip the liked flag of a track, returning the new state
    pub fn toggle_like(&mut self, track_id: TrackId) -> bool {
        let liked = if self.liked.remove(&track_id) {
            false
        } else {
            self.liked.insert(track_id.clone());
            true
        };
        if let Err(e) = self.prefs.set_liked(&self.liked) {
            warn!(error = %e, "Could not persist liked tracks");
        }
        self.emit(PlaybackEvent::LikedChanged { track_id, liked });
        liked
    }

    pub fn set_theme(&mut self, theme: &str) {
        if let Err(e) = self.prefs.set_theme(theme) {
            warn!(error = %e, "Could not persist theme");
        }
    }

    pub fn clear_error(&mut self) {
        if self.error.take().is_some() {
            self.emit(PlaybackEvent::ErrorCleared);
        }
    }

    // ===== Queue editing =====

    /// Replace the queue, keeping the loaded track if it is still present
    pub fn set_queue(&mut self, tracks: Vec<Track>) {
        let keep = self
            .queue
            .current_track()
            .and_then(|current| tracks.iter().position(|t| t.id == current.id));

        // `keep` indexes into `tracks`, so the selection is always valid
        if let Err(e) = self.queue.set(tracks, keep) {
            warn!(error = %e, "Queue replacement rejected");
            return;
        }

        if keep.is_none() && (self.sound.is_some() || self.pending.is_some()) {
            self.unload_current();
        }
        self.queue_changed();
    }

    pub fn append(&mut self, track: Track) {
        self.queue.append(track);
        self.queue_changed();
    }

    pub fn insert_next(&mut self, track: Track) {
        self.queue.insert_next(track);
        self.queue_changed();
    }

    /// Remove an entry; removing the loaded track stops playback
    pub fn remove(&mut self, index: usize) -> Result<Track> {
        let (track, removal) = self.queue.remove(index)?;
        if removal == Removal::Current {
            self.unload_current();
        }
        self.queue_changed();
        Ok(track)
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        self.queue.reorder(from, to)?;
        self.queue_changed();
        Ok(())
    }

    pub fn clear_queue(&mut self) {
        self.unload_current();
        self.queue.clear();
        self.queue_changed();
    }

    fn unload_current(&mut self) {
        self.teardown_sound();
        self.elapsed = 0.0;
        self.duration = 0.0;
        self.set_status(TransportStatus::Idle);
        self.emit(PlaybackEvent::TrackChanged {
            index: None,
            track: None,
        });
    }

    fn queue_changed(&mut self) {
        self.emit(PlaybackEvent::QueueChanged {
            len: self.queue.len(),
        });
        self.request_save();
    }

    // ===== Timers =====

    /// Whether the per-frame progress loop should run
    pub fn wants_ticks(&self) -> bool {
        self.status == TransportStatus::Playing
    }

    /// Per-frame progress poll: position, fade and periodic progress save
    pub fn tick(&mut self, now: Instant) {
        if self.status != TransportStatus::Playing {
            return;
        }

        self.refresh_position();

        if let Some(fade) = self.fade {
            let gain = self.volume.level() * fade.factor(now);
            if let Some(sound) = self.sound.as_mut() {
                sound.set_volume(gain);
            }
            if fade.is_complete(now) {
                self.fade = None;
            }
        }

        self.emit(PlaybackEvent::PositionUpdate {
            elapsed: self.elapsed,
            duration: self.duration,
        });

        if self.session.progress_due(now) {
            if let Err(e) = self.session.save_progress(now, self.elapsed) {
                warn!(error = %e, "Could not save session progress");
            }
        }
    }

    fn refresh_position(&mut self) {
        if self.pending.is_some() {
            return;
        }
        if let Some(sound) = &self.sound {
            let position = sound.position();
            if position.is_finite() {
                self.elapsed = position.max(0.0);
            }
        }
    }

    /// Pending debounce deadline for the session snapshot
    pub fn session_deadline(&self) -> Option<Instant> {
        self.session.deadline()
    }

    /// Write the snapshot if the debounce window has passed
    pub fn flush_session_if_due(&mut self, now: Instant) {
        if self.session.save_due(now) {
            self.save_session();
        }
    }

    fn request_save(&mut self) {
        self.session.request_save(Instant::now());
    }

    /// Write the snapshot now
    pub fn save_session(&mut self) {
        let snapshot = SessionSnapshot::capture(
            &self.queue,
            self.elapsed,
            self.volume.level(),
            self.shuffle_enabled,
            self.repeat,
        );
        if let Err(e) = self.session.save_snapshot(&snapshot) {
            warn!(error = %e, "Could not save session");
        }
    }

    // ===== Session restore =====

    /// Rehydrate the stored session, muted and without starting transport
    ///
    /// Returns `true` when a session was found and a restore load started.
    pub fn restore_session(&mut self) -> bool {
        let Some(snapshot) = self.session.load() else {
            return false;
        };

        let tracks = self.library.resolve_ids(&snapshot.queue_ids);
        if tracks.is_empty() {
            debug!("Stored session has no known tracks, discarding");
            self.session.discard();
            return false;
        }

        let index = snapshot
            .current_song_id
            .as_ref()
            .and_then(|id| tracks.iter().position(|t| &t.id == id))
            .unwrap_or_else(|| snapshot.index().unwrap_or(0).min(tracks.len() - 1));

        info!(
            queue_len = tracks.len(),
            dropped = snapshot.queue_ids.len() - tracks.len(),
            index,
            "Restoring session"
        );

        if let Err(e) = self.queue.set(tracks, None) {
            debug!(error = %e, "Discarding unusable session");
            self.session.discard();
            return false;
        }
        self.volume.set_level(snapshot.volume);
        self.shuffle_enabled = snapshot.is_shuffling;
        self.repeat = snapshot.repeat_mode;

        self.emit(PlaybackEvent::QueueChanged {
            len: self.queue.len(),
        });
        self.emit(PlaybackEvent::VolumeChanged {
            volume: self.volume.level(),
        });
        self.emit(PlaybackEvent::ShuffleChanged {
            enabled: self.shuffle_enabled,
        });
        self.emit(PlaybackEvent::RepeatChanged { mode: self.repeat });

        self.begin_load(index, LoadIntent::restore(snapshot.progress));
        true
    }

    // ===== Sync =====

    fn publish(&mut self, event: SyncEvent) {
        if let Some(sync) = &self.sync {
            sync.publish(event);
        }
    }

    /// Apply an event from a peer without re-publishing it
    pub fn apply_remote(&mut self, event: SyncEvent) {
        let Some(sync) = self.sync.as_mut() else {
            return;
        };
        debug!(event = event.name(), "Applying remote sync event");
        sync.begin_remote();

        match event {
            SyncEvent::Play => self.play(),
            SyncEvent::Pause => self.pause(),
            SyncEvent::Seek { time } => self.seek(time),
            SyncEvent::ChangeTrack { track } => {
                if let Some(index) = self.local_position(&track) {
                    self.begin_load(index, LoadIntent::play());
                }
            }
            SyncEvent::RequestState => self.answer_state_request(),
            SyncEvent::State {
                track,
                time,
                playing,
            } => self.apply_remote_state(track, time, playing),
        }

        if let Some(sync) = self.sync.as_mut() {
            sync.end_remote();
        }
    }

    fn answer_state_request(&mut self) {
        if !(self.status.has_sound() || self.status == TransportStatus::Loading) {
            return;
        }
        let Some(track) = self.queue.current_track().cloned() else {
            return;
        };
        self.refresh_position();

        if let Some(sync) = &self.sync {
            sync.publish_reply(SyncEvent::State {
                track,
                time: self.elapsed,
                playing: self.status == TransportStatus::Playing,
            });
        }
    }

    fn apply_remote_state(&mut self, track: Track, time: f64, playing: bool) {
        let loaded = self.queue.current_track().is_some_and(|t| t.id == track.id)
            && (self.status.has_sound() || self.status == TransportStatus::Loading);

        if loaded {
            self.seek(time);
            if playing {
                self.play();
            } else {
                self.pause();
            }
            return;
        }

        let Some(index) = self.local_position(&track) else {
            return;
        };
        self.begin_load(
            index,
            LoadIntent {
                autoplay: playing,
                start_at: time,
                restore: false,
            },
        );
    }

    /// Queue position of a peer's track; unknown tracks are dropped
    fn local_position(&self, track: &Track) -> Option<usize> {
        let index = self.queue.position_of(&track.id);
        if index.is_none() {
            debug!(track_id = %track.id, "Dropping remote event for unknown track");
        }
        index
    }

    // ===== Lifecycle =====

    /// Flush the session, release the sound, leave the sync room
    pub fn dispose(&mut self) {
        self.refresh_position();
        self.save_session();
        self.teardown_sound();
        if let Some(sync) = self.sync.as_mut() {
            sync.leave();
        }
        self.set_status(TransportStatus::Idle);
        info!("Playback controller disposed");
    }

    // ===== State access =====

    fn set_status(&mut self, status: TransportStatus) {
        if self.status != status {
            debug!(from = ?self.status, to = ?status, "Transport status changed");
            self.status = status;
            self.emit(PlaybackEvent::StateChanged { status });
        }
    }

    fn emit(&mut self, event: PlaybackEvent) {
        self.pending_events.push(event);
    }

    /// Take events produced since the last call
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.status,
            current_index: self.queue.current_index(),
            current_track: self.queue.current_track().cloned(),
            queue_len: self.queue.len(),
            elapsed: self.elapsed,
            duration: self.duration,
            volume: self.volume.level(),
            shuffle: self.shuffle_enabled,
            repeat: self.repeat,
            error: self.error.clone(),
        }
    }

    pub fn status(&self) -> TransportStatus {
        self.status
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn current_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn liked(&self) -> &HashSet<TrackId> {
        &self.liked
    }

    pub fn library(&self) -> &LibraryCache {
        &self.library
    }

    pub fn graph(&self) -> &AudioGraphManager {
        &self.graph
    }

    pub fn sync_channel(&self) -> Option<&SyncChannel> {
        self.sync.as_ref()
    }

    /// Current load generation
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

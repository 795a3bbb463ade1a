//! Shared test doubles for the playback engine

#![allow(dead_code)]

use async_trait::async_trait;
use soul_core::{
    Album, CatalogClient, KeyValueStore, SignedUrl, SoulError, SourceRef, Track, TrackId,
};
use soul_playback::{
    Collaborators, EngineEvent, LibraryCache, OutputContext, PlaybackConfig, PlaybackController,
    PlaybackError, SoundEvent, SoundEventSender, SoundFactory, SoundInstance, SoundRequest,
    SyncEnvelope, SyncEvent, SyncTransport,
};
use soul_storage::MemoryStore;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::mpsc;

static TRACING: Once = Once::new();

/// Install a test subscriber once (`RUST_LOG` controls verbosity)
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ===== Tracks =====

pub fn track(id: &str) -> Track {
    Track::new(id, format!("Track {id}"), "Test Artist").with_duration(180.0)
}

/// Track whose source must be resolved by the catalog
pub fn remote_track(id: &str) -> Track {
    track(id).with_source(SourceRef::indirect(format!("songs/{id}.mp3")))
}

pub fn tracks(n: usize) -> Vec<Track> {
    (0..n).map(|i| track(&format!("t{i}"))).collect()
}

pub fn ids(ids: &[&str]) -> Vec<TrackId> {
    ids.iter().map(|id| TrackId::new(*id)).collect()
}

// ===== Sounds =====

/// Observable state of one mock sound instance
#[derive(Debug, Clone, Default)]
pub struct SoundState {
    pub track_id: Option<TrackId>,
    pub url: String,
    pub playing: bool,
    pub volume: f32,
    pub position: f64,
    pub seeks: Vec<f64>,
    pub released: bool,
}

struct MockSound {
    state: Arc<Mutex<SoundState>>,
    live: Arc<AtomicUsize>,
    refuse_play: bool,
}

impl SoundInstance for MockSound {
    fn play(&mut self) -> soul_playback::Result<()> {
        if self.refuse_play {
            return Err(PlaybackError::Play("autoplay blocked".to_string()));
        }
        self.state.lock().unwrap().playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn seek(&mut self, position: f64) {
        let mut state = self.state.lock().unwrap();
        state.position = position;
        state.seeks.push(position);
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().unwrap().volume = volume;
    }

    fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    fn stop(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn unload(&mut self) {
        let mut state = self.state.lock().unwrap();
        if !state.released {
            state.released = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Sound factory that records every instance it hands out
pub struct MockSounds {
    created: Mutex<Vec<(Arc<Mutex<SoundState>>, SoundEventSender)>>,
    live: Arc<AtomicUsize>,
    max_live: AtomicUsize,
    auto_load: Option<f64>,
    failing_urls: Mutex<HashSet<String>>,
    refuse_play: AtomicBool,
}

impl MockSounds {
    /// Instances report `Loaded` (180 s) immediately
    pub fn new() -> Arc<Self> {
        Self::build(Some(180.0))
    }

    /// Tests drive `Loaded` themselves
    pub fn manual() -> Arc<Self> {
        Self::build(None)
    }

    fn build(auto_load: Option<f64>) -> Arc<Self> {
        Arc::new(Self {
            created: Mutex::new(Vec::new()),
            live: Arc::new(AtomicUsize::new(0)),
            max_live: AtomicUsize::new(0),
            auto_load,
            failing_urls: Mutex::new(HashSet::new()),
            refuse_play: AtomicBool::new(false),
        })
    }

    pub fn fail_url(&self, url: impl Into<String>) {
        self.failing_urls.lock().unwrap().insert(url.into());
    }

    pub fn refuse_play(&self, refuse: bool) {
        self.refuse_play.store(refuse, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn state(&self, index: usize) -> SoundState {
        self.created.lock().unwrap()[index].0.lock().unwrap().clone()
    }

    pub fn last(&self) -> SoundState {
        let created = self.created.lock().unwrap();
        let last = created.last().expect("no sound created");
        let state = last.0.lock().unwrap().clone();
        state
    }

    /// Move the playhead of the newest instance
    pub fn set_position(&self, position: f64) {
        let created = self.created.lock().unwrap();
        created.last().expect("no sound created").0.lock().unwrap().position = position;
    }

    /// Report an event from instance `index`
    pub fn emit(&self, index: usize, event: SoundEvent) {
        self.created.lock().unwrap()[index].1.send(event);
    }

    /// Report an event from the newest instance
    pub fn emit_last(&self, event: SoundEvent) {
        let created = self.created.lock().unwrap();
        created.last().expect("no sound created").1.send(event);
    }
}

impl SoundFactory for MockSounds {
    fn create(&self, request: SoundRequest) -> soul_playback::Result<Box<dyn SoundInstance>> {
        if self.failing_urls.lock().unwrap().contains(&request.url) {
            return Err(PlaybackError::Load {
                track_id: request.track_id,
                message: "unsupported format".to_string(),
            });
        }

        let state = Arc::new(Mutex::new(SoundState {
            track_id: Some(request.track_id),
            url: request.url,
            volume: request.volume,
            ..SoundState::default()
        }));

        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);

        if let Some(duration) = self.auto_load {
            request.events.send(SoundEvent::Loaded { duration });
        }
        self.created
            .lock()
            .unwrap()
            .push((Arc::clone(&state), request.events));

        Ok(Box::new(MockSound {
            state,
            live: Arc::clone(&self.live),
            refuse_play: self.refuse_play.load(Ordering::SeqCst),
        }))
    }
}

// ===== Output =====

#[derive(Default)]
pub struct MockOutput {
    pub suspended: AtomicBool,
    pub resumes: AtomicUsize,
}

impl MockOutput {
    pub fn suspended() -> Arc<Self> {
        let output = Self::default();
        output.suspended.store(true, Ordering::SeqCst);
        Arc::new(output)
    }
}

impl OutputContext for MockOutput {
    fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    fn resume(&self) -> soul_playback::Result<()> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        self.suspended.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        48_000
    }
}

// ===== Catalog =====

#[derive(Default)]
pub struct MockCatalog {
    tracks: Vec<Track>,
    offline: bool,
    failing_keys: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    resolved: AtomicUsize,
}

impl MockCatalog {
    pub fn with_tracks(tracks: Vec<Track>) -> Arc<Self> {
        Arc::new(Self {
            tracks,
            ..Self::default()
        })
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            offline: true,
            ..Self::default()
        })
    }

    pub fn fail_key(&self, key: impl Into<String>) {
        self.failing_keys.lock().unwrap().insert(key.into());
    }

    pub fn delay_key(&self, key: impl Into<String>, delay: Duration) {
        self.delays.lock().unwrap().insert(key.into(), delay);
    }

    pub fn resolved(&self) -> usize {
        self.resolved.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    async fn list_tracks(&self) -> soul_core::Result<Vec<Track>> {
        if self.offline {
            return Err(SoulError::network("catalog offline"));
        }
        Ok(self.tracks.clone())
    }

    async fn list_albums(&self) -> soul_core::Result<Vec<Album>> {
        Ok(Vec::new())
    }

    async fn resolve_source(&self, key: &str) -> soul_core::Result<SignedUrl> {
        let delay = self.delays.lock().unwrap().get(key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.resolved.fetch_add(1, Ordering::SeqCst);

        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(SoulError::catalog(format!("no source for {key}")));
        }
        Ok(SignedUrl {
            url: signed_url(key),
            expires_in: Duration::from_secs(3600),
        })
    }
}

pub fn signed_url(key: &str) -> String {
    format!("https://cdn.test/{key}?sig=1")
}

// ===== Sync =====

/// Transport that records what the client publishes
#[derive(Default)]
pub struct RecordingTransport {
    published: Mutex<Vec<SyncEnvelope>>,
    inbound: Mutex<Option<mpsc::UnboundedSender<SyncEnvelope>>>,
    pub left: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Events published so far
    pub fn published(&self) -> Vec<SyncEvent> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|envelope| envelope.event.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

impl SyncTransport for RecordingTransport {
    fn join(
        &self,
        _room: &str,
        _client_id: &str,
    ) -> soul_playback::Result<mpsc::UnboundedReceiver<SyncEnvelope>> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inbound.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    fn publish(&self, envelope: &SyncEnvelope) -> soul_playback::Result<()> {
        self.published.lock().unwrap().push(envelope.clone());
        Ok(())
    }

    fn leave(&self, _room: &str, _client_id: &str) {
        self.left.store(true, Ordering::SeqCst);
    }
}

// ===== Harness =====

/// Controller wired to mocks, driven synchronously by the test
pub struct Harness {
    pub controller: PlaybackController,
    pub events: mpsc::UnboundedReceiver<EngineEvent>,
    pub sounds: Arc<MockSounds>,
    pub catalog: Arc<MockCatalog>,
    pub store: Arc<MemoryStore>,
    pub output: Arc<MockOutput>,
}

pub struct HarnessBuilder {
    config: PlaybackConfig,
    library: Vec<Track>,
    sounds: Arc<MockSounds>,
    catalog: Arc<MockCatalog>,
    store: Arc<MemoryStore>,
    output: Arc<MockOutput>,
    sync: Option<Arc<dyn SyncTransport>>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        init_tracing();
        Self {
            config: PlaybackConfig::default(),
            library: Vec::new(),
            sounds: MockSounds::new(),
            catalog: Arc::new(MockCatalog::default()),
            store: Arc::new(MemoryStore::new()),
            output: Arc::new(MockOutput::default()),
            sync: None,
        }
    }

    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn library(mut self, tracks: Vec<Track>) -> Self {
        self.library = tracks;
        self
    }

    pub fn sounds(mut self, sounds: Arc<MockSounds>) -> Self {
        self.sounds = sounds;
        self
    }

    pub fn catalog(mut self, catalog: Arc<MockCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn store(mut self, store: Arc<MemoryStore>) -> Self {
        self.store = store;
        self
    }

    pub fn output(mut self, output: Arc<MockOutput>) -> Self {
        self.output = output;
        self
    }

    pub fn sync(mut self, transport: Arc<dyn SyncTransport>) -> Self {
        self.sync = Some(transport);
        self
    }

    pub fn build(self) -> Harness {
        let parts = Collaborators {
            catalog: self.catalog.clone(),
            store: self.store.clone(),
            sounds: self.sounds.clone(),
            output: self.output.clone(),
            sync: self.sync,
        };
        let (mut controller, events) = PlaybackController::new(
            self.config,
            parts,
            LibraryCache::from_tracks(self.library),
        );
        controller.build_graph();

        Harness {
            controller,
            events,
            sounds: self.sounds,
            catalog: self.catalog,
            store: self.store,
            output: self.output,
        }
    }
}

impl Harness {
    pub fn new() -> Self {
        HarnessBuilder::new().build()
    }

    /// Deliver every queued internal event, letting spawned resolutions run
    pub async fn settle(&mut self) {
        for _ in 0..8 {
            tokio::task::yield_now().await;
            while let Ok(event) = self.events.try_recv() {
                self.controller.handle_engine_event(event);
            }
        }
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.store.get(key).unwrap()
    }
}

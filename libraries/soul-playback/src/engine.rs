//! Engine task and handle
//!
//! The controller lives on one tokio task. Callers talk to it through an
//! [`EngineHandle`] that sends [`PlaybackCommand`]s; the task multiplexes those
//! with internal load events, remote sync events, the progress ticker and the
//! session debounce deadline.

use crate::config::PlaybackConfig;
use crate::controller::{Collaborators, PlaybackController};
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::graph::{AnalysisTap, GraphProcessor};
use crate::library::LibraryCache;
use crate::sound::EngineEvent;
use crate::sync::SyncEnvelope;
use crate::types::PlaybackSnapshot;
use soul_core::{EqualizerSettings, Track, TrackId};
use std::future::pending;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const COMMAND_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;

/// Commands accepted by the engine task
#[derive(Debug)]
pub enum PlaybackCommand {
    LoadAndPlay {
        index: usize,
        queue: Vec<Track>,
        reply: oneshot::Sender<Result<()>>,
    },
    PlayIndex {
        index: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    Play,
    Pause,
    Seek(f64),
    Next,
    Prev,
    SetVolume(f32),
    ToggleShuffle,
    CycleRepeat,
    SetEqualizer(EqualizerSettings),
    ToggleLike {
        track_id: TrackId,
        reply: oneshot::Sender<bool>,
    },
    SetTheme(String),
    SetQueue(Vec<Track>),
    Append(Track),
    InsertNext(Track),
    Remove {
        index: usize,
        reply: oneshot::Sender<Result<Track>>,
    },
    Reorder {
        from: usize,
        to: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    ClearQueue,
    ClearError,
    Snapshot(oneshot::Sender<PlaybackSnapshot>),
    /// Flush the session, release the sound, leave the sync room and stop
    Shutdown(oneshot::Sender<()>),
}

/// Playback engine entry point
pub struct Engine;

impl Engine {
    /// Initialize and spawn the engine task
    ///
    /// Refreshes the library cache, builds the audio graph, joins the sync
    /// room, restores the stored session (paused) and asks peers for their
    /// state. A catalog failure leaves the library empty.
    pub async fn init(config: PlaybackConfig, parts: Collaborators) -> Result<EngineHandle> {
        config.validate()?;

        let mut library = LibraryCache::new();
        match library.refresh(parts.catalog.as_ref()).await {
            Ok(count) => info!(tracks = count, "Library loaded"),
            Err(e) => warn!(error = %e, "Library refresh failed, starting empty"),
        }

        let poll = config.progress_poll();
        let (mut controller, internal) = PlaybackController::new(config, parts, library);
        controller.build_graph();
        let sync = controller.connect_sync();
        controller.restore_session();
        controller.request_remote_state();

        let analysis = controller.graph().analysis_tap();
        let processor = controller.graph().processor();

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(controller.snapshot());

        let mut task = EngineTask {
            controller,
            commands: command_rx,
            internal,
            sync,
            events: events_tx.clone(),
            state: state_tx,
        };
        task.publish();
        tokio::spawn(task.run(poll));

        info!("Playback engine started");
        Ok(EngineHandle {
            commands: command_tx,
            events: events_tx,
            state: state_rx,
            analysis,
            processor,
        })
    }
}

struct EngineTask {
    controller: PlaybackController,
    commands: mpsc::Receiver<PlaybackCommand>,
    internal: mpsc::UnboundedReceiver<EngineEvent>,
    sync: Option<mpsc::UnboundedReceiver<SyncEnvelope>>,
    events: broadcast::Sender<PlaybackEvent>,
    state: watch::Sender<PlaybackSnapshot>,
}

impl EngineTask {
    async fn run(mut self, poll: std::time::Duration) {
        let mut ticker = interval(poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let ticking = self.controller.wants_ticks();
            let deadline = self.controller.session_deadline();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(PlaybackCommand::Shutdown(reply)) => {
                        self.controller.dispose();
                        self.publish();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All engine handles dropped");
                        self.controller.dispose();
                        self.publish();
                        break;
                    }
                },
                Some(event) = self.internal.recv() => self.controller.handle_engine_event(event),
                envelope = recv_remote(&mut self.sync) => match envelope {
                    Some(envelope) => self.controller.apply_remote(envelope.event),
                    None => {
                        warn!("Sync transport closed");
                        self.sync = None;
                    }
                },
                _ = ticker.tick(), if ticking => self.controller.tick(Instant::now()),
                () = wait_until(deadline) => self.controller.flush_session_if_due(Instant::now()),
            }

            self.publish();
        }

        info!("Playback engine stopped");
    }

    fn handle_command(&mut self, command: PlaybackCommand) {
        let c = &mut self.controller;
        match command {
            PlaybackCommand::LoadAndPlay {
                index,
                queue,
                reply,
            } => {
                let _ = reply.send(c.load_and_play(index, queue));
            }
            PlaybackCommand::PlayIndex { index, reply } => {
                let _ = reply.send(c.play_index(index));
            }
            PlaybackCommand::Play => c.play(),
            PlaybackCommand::Pause => c.pause(),
            PlaybackCommand::Seek(time) => c.seek(time),
            PlaybackCommand::Next => c.next(),
            PlaybackCommand::Prev => c.prev(),
            PlaybackCommand::SetVolume(volume) => c.set_volume(volume),
            PlaybackCommand::ToggleShuffle => c.toggle_shuffle(),
            PlaybackCommand::CycleRepeat => c.cycle_repeat(),
            PlaybackCommand::SetEqualizer(settings) => c.apply_equalizer(settings),
            PlaybackCommand::ToggleLike { track_id, reply } => {
                let _ = reply.send(c.toggle_like(track_id));
            }
            PlaybackCommand::SetTheme(theme) => c.set_theme(&theme),
            PlaybackCommand::SetQueue(tracks) => c.set_queue(tracks),
            PlaybackCommand::Append(track) => c.append(track),
            PlaybackCommand::InsertNext(track) => c.insert_next(track),
            PlaybackCommand::Remove { index, reply } => {
                let _ = reply.send(c.remove(index));
            }
            PlaybackCommand::Reorder { from, to, reply } => {
                let _ = reply.send(c.reorder(from, to));
            }
            PlaybackCommand::ClearQueue => c.clear_queue(),
            PlaybackCommand::ClearError => c.clear_error(),
            PlaybackCommand::Snapshot(reply) => {
                let _ = reply.send(c.snapshot());
            }
            // Intercepted by `run` before dispatch
            PlaybackCommand::Shutdown(_) => debug!("Shutdown reached command dispatch"),
        }
    }

    /// Fan out drained events and the latest snapshot
    fn publish(&mut self) {
        for event in self.controller.drain_events() {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
        self.state.send_replace(self.controller.snapshot());
    }
}

async fn recv_remote(rx: &mut Option<mpsc::UnboundedReceiver<SyncEnvelope>>) -> Option<SyncEnvelope> {
    match rx {
        Some(rx) => rx.recv().await,
        None => pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

/// Cloneable handle to a running engine
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<PlaybackCommand>,
    events: broadcast::Sender<PlaybackEvent>,
    state: watch::Receiver<PlaybackSnapshot>,
    analysis: Option<AnalysisTap>,
    processor: Option<GraphProcessor>,
}

impl EngineHandle {
    async fn send(&self, command: PlaybackCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::EngineClosed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> PlaybackCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| PlaybackError::EngineClosed)
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Latest published snapshot
    pub fn state(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.state.clone()
    }

    /// Spectrum/waveform reader for visualizers
    pub fn analysis_tap(&self) -> Option<AnalysisTap> {
        self.analysis.clone()
    }

    /// Filter chain for the platform output callback
    pub fn processor(&self) -> Option<GraphProcessor> {
        self.processor.clone()
    }

    /// Snapshot taken after every earlier command was applied
    pub async fn snapshot(&self) -> Result<PlaybackSnapshot> {
        self.request(PlaybackCommand::Snapshot).await
    }

    pub async fn load_and_play(&self, index: usize, queue: Vec<Track>) -> Result<()> {
        self.request(|reply| PlaybackCommand::LoadAndPlay {
            index,
            queue,
            reply,
        })
        .await?
    }

    pub async fn play_index(&self, index: usize) -> Result<()> {
        self.request(|reply| PlaybackCommand::PlayIndex { index, reply })
            .await?
    }

    pub async fn play(&self) -> Result<()> {
        self.send(PlaybackCommand::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(PlaybackCommand::Pause).await
    }

    pub async fn seek(&self, time: f64) -> Result<()> {
        self.send(PlaybackCommand::Seek(time)).await
    }

    pub async fn next(&self) -> Result<()> {
        self.send(PlaybackCommand::Next).await
    }

    pub async fn prev(&self) -> Result<()> {
        self.send(PlaybackCommand::Prev).await
    }

    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(PlaybackCommand::SetVolume(volume)).await
    }

    pub async fn toggle_shuffle(&self) -> Result<()> {
        self.send(PlaybackCommand::ToggleShuffle).await
    }

    pub async fn cycle_repeat(&self) -> Result<()> {
        self.send(PlaybackCommand::CycleRepeat).await
    }

    pub async fn set_equalizer(&self, settings: EqualizerSettings) -> Result<()> {
        self.send(PlaybackCommand::SetEqualizer(settings)).await
    }

    /// Returns the new liked state
    pub async fn toggle_like(&self, track_id: TrackId) -> Result<bool> {
        self.request(|reply| PlaybackCommand::ToggleLike { track_id, reply })
            .await
    }

    pub async fn set_theme(&self, theme: impl Into<String>) -> Result<()> {
        self.send(PlaybackCommand::SetTheme(theme.into())).await
    }

    pub async fn set_queue(&self, tracks: Vec<Track>) -> Result<()> {
        self.send(PlaybackCommand::SetQueue(tracks)).await
    }

    pub async fn append(&self, track: Track) -> Result<()> {
        self.send(PlaybackCommand::Append(track)).await
    }

    pub async fn insert_next(&self, track: Track) -> Result<()> {
        self.send(PlaybackCommand::InsertNext(track)).await
    }

    pub async fn remove(&self, index: usize) -> Result<Track> {
        self.request(|reply| PlaybackCommand::Remove { index, reply })
            .await?
    }

    pub async fn reorder(&self, from: usize, to: usize) -> Result<()> {
        self.request(|reply| PlaybackCommand::Reorder { from, to, reply })
            .await?
    }

    pub async fn clear_queue(&self) -> Result<()> {
        self.send(PlaybackCommand::ClearQueue).await
    }

    pub async fn clear_error(&self) -> Result<()> {
        self.send(PlaybackCommand::ClearError).await
    }

    /// Stop the engine task
    ///
    /// Flushes the session snapshot, tears down the sound and leaves the sync
    /// room. Calling it on a stopped engine is a no-op.
    pub async fn shutdown(&self) {
        if self.request(PlaybackCommand::Shutdown).await.is_err() {
            debug!("Engine already stopped");
        }
    }
}

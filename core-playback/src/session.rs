//! # Playback Session
//!
//! Owns the current track, its native handle and the progress sampler.
//!
//! ## Overview
//!
//! [`MediaSession`] is a cheap, cloneable command handle. All state lives in a
//! single task that processes commands, engine notifications, switch deadlines
//! and sampler ticks one at a time, so the "current track / handle / sampler"
//! triple is never observed half-updated.
//!
//! ## State machine
//!
//! | Current          | Event          | Action                                               |
//! |------------------|----------------|------------------------------------------------------|
//! | nothing active   | `play(id)`     | build handle, play, start sampler                    |
//! | A running        | `play(A)`      | pause A, stop sampler                                |
//! | A not running    | `play(A)`      | resume A, start sampler                              |
//! | A active         | `play(B)`      | stop + release A, start B after the settle step      |
//! | any              | `pause()`      | pause, stop sampler, cancel a pending start          |
//! | any              | `seek_to(s)`   | forward to the handle if one exists                  |
//! | A active         | completion     | stop sampler, release, clear current, success hook   |
//! | any              | engine error   | error hook, no state change                          |
//! | any              | status change  | copy into track, status hook                         |
//!
//! Only one native handle is ever live: the previous handle is always stopped
//! and released before the next one is created.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::media::{
    MediaEngine, MediaError, MediaErrorCode, MediaHandle, MediaHandleId, MediaNotice,
    MediaNotification, MediaNotifier, MediaStatus,
};
use bridge_traits::BridgeError;
use core_runtime::config::{SessionConfig, SwitchSettle};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, SessionEvent};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, instrument, warn};

use crate::error::{PlaybackError, Result};
use crate::registry::TrackRegistry;
use crate::sampler::{self, ProgressSampler};
use crate::track::{Track, TrackDescriptor, TrackHooks, TrackId, TrackState};

/// Point-in-time view of the session, ordered after every command sent before
/// it was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub current_track: Option<TrackId>,
    /// A native handle exists for the current track.
    pub handle_active: bool,
    pub sampler_active: bool,
    /// Track waiting for the switch settle step.
    pub pending_track: Option<TrackId>,
}

enum Command {
    Play(TrackId),
    Pause,
    SeekTo(f64),
    Destroy,
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a running playback session.
///
/// Transport commands return as soon as they are queued. Failures of the
/// native engine are routed to the owning track's error hook and to
/// [`PlaybackEvent::Error`]; they are never returned from these methods.
#[derive(Clone)]
pub struct MediaSession {
    commands: mpsc::UnboundedSender<Command>,
    registry: TrackRegistry,
    events: EventBus,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl MediaSession {
    /// Spawn the session task on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::EngineUnavailable`] when the engine reports that the
    /// device media capability is missing.
    ///
    /// # Panics
    ///
    /// Outside a Tokio runtime.
    pub fn start(config: SessionConfig) -> Result<Self> {
        let engine = config.engine;
        if !engine.is_available() {
            warn!("Media engine reports no device media capability");
            return Err(PlaybackError::EngineUnavailable(
                "device media capability not present".to_string(),
            ));
        }

        let settle = match config.switch_settle {
            SwitchSettle::ReleaseAck { timeout } if !engine.acknowledges_release() => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Engine does not acknowledge releases; using the timeout as a fixed delay"
                );
                SwitchSettle::Delay(timeout)
            }
            settle => settle,
        };

        let events = EventBus::new(config.event_buffer_size);
        let registry = TrackRegistry::with_events(events.clone());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let actor = SessionActor {
            engine,
            registry: registry.clone(),
            events: events.clone(),
            settle,
            commands: command_rx,
            notices: notice_rx,
            notice_tx,
            current: None,
            owners: HashMap::new(),
            pending: None,
            sampler: ProgressSampler::new(config.poll_interval),
        };

        let awaits_release_ack = matches!(settle, SwitchSettle::ReleaseAck { .. });
        info!(
            poll_ms = config.poll_interval.as_millis() as u64,
            awaits_release_ack, "Playback session started"
        );
        events
            .emit(CoreEvent::Session(SessionEvent::Ready { awaits_release_ack }))
            .ok();

        let task = tokio::spawn(actor.run());

        Ok(Self {
            commands: command_tx,
            registry,
            events,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register a track with this session's registry.
    pub fn register(&self, descriptor: TrackDescriptor, hooks: TrackHooks) -> Result<TrackId> {
        self.registry.register(descriptor, hooks)
    }

    pub fn observe(&self, id: TrackId) -> Option<watch::Receiver<TrackState>> {
        self.registry.observe(id)
    }

    /// Play, toggle or switch to track `id`. Unknown ids are ignored.
    pub fn play(&self, id: TrackId) -> Result<()> {
        self.send(Command::Play(id))
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    /// Seek the current handle to `position` seconds; a no-op without one.
    ///
    /// Negative and non-finite positions seek to zero. Positions too large
    /// for a [`Duration`] are reported through the track's error hook.
    pub fn seek_to(&self, position: f64) -> Result<()> {
        self.send(Command::SeekTo(position))
    }

    /// Stop sampling and release any handle, whichever track is current.
    ///
    /// The session stays usable afterwards.
    pub fn destroy(&self) -> Result<()> {
        self.send(Command::Destroy)
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        rx.await.map_err(|_| PlaybackError::SessionClosed)
    }

    /// Destroy and stop the session task, waiting for it to exit.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(tx)).is_ok() {
            rx.await.ok();
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            task.await.ok();
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| PlaybackError::SessionClosed)
    }
}

impl std::fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSession")
            .field("tracks", &self.registry.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Session task
// ============================================================================

struct ActiveMedia {
    track: Arc<Track>,
    handle_id: MediaHandleId,
    handle: Box<dyn MediaHandle>,
}

struct PendingStart {
    track: Arc<Track>,
    deadline: Instant,
    /// Released handle whose acknowledgment ends the wait early.
    awaiting_release: Option<MediaHandleId>,
}

struct SessionActor {
    engine: Arc<dyn MediaEngine>,
    registry: TrackRegistry,
    events: EventBus,
    settle: SwitchSettle,
    commands: mpsc::UnboundedReceiver<Command>,
    notices: mpsc::UnboundedReceiver<MediaNotice>,
    notice_tx: mpsc::UnboundedSender<MediaNotice>,
    current: Option<ActiveMedia>,
    /// Handles that may still send notifications, including torn-down ones
    /// until they report `Released`.
    owners: HashMap<MediaHandleId, TrackId>,
    pending: Option<PendingStart>,
    sampler: ProgressSampler,
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

impl SessionActor {
    async fn run(mut self) {
        loop {
            let deadline = self.pending.as_ref().map(|pending| pending.deadline);

            tokio::select! {
                biased;

                Some(notice) = self.notices.recv() => self.handle_notice(notice).await,
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown(done)) => {
                        self.destroy().await;
                        done.send(()).ok();
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.destroy().await;
                        break;
                    }
                },
                _ = wait_until(deadline) => self.start_pending().await,
                _ = self.sampler.tick() => self.sample_progress().await,
            }
        }

        debug!("Playback session task exiting");
        self.events
            .emit(CoreEvent::Session(SessionEvent::Shutdown))
            .ok();
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Play(id) => self.play(id).await,
            Command::Pause => self.pause().await,
            Command::SeekTo(position) => self.seek_to(position).await,
            Command::Destroy => self.destroy().await,
            Command::Snapshot(reply) => {
                reply.send(self.snapshot()).ok();
            }
            Command::Shutdown(_) => {}
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_track: self.current.as_ref().map(|active| active.track.id()),
            handle_active: self.current.is_some(),
            sampler_active: self.sampler.is_active(),
            pending_track: self.pending.as_ref().map(|pending| pending.track.id()),
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        self.events.emit(CoreEvent::Playback(event)).ok();
    }

    fn route_error(&self, track: &Track, error: MediaError) {
        warn!(track_id = track.id(), code = ?error.code, message = %error.message, "Media error");
        track.hooks().error(&error);
        self.emit(PlaybackEvent::Error {
            track_id: track.id(),
            code: error.code,
            message: error.message,
        });
    }

    fn route_bridge_error(&self, track: &Track, error: &BridgeError) {
        self.route_error(track, MediaError::from(error));
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn play(&mut self, id: TrackId) {
        let Some(track) = self.registry.get(id) else {
            warn!(track_id = id, "Ignoring play for unregistered track");
            return;
        };

        let current_id = self.current.as_ref().map(|active| active.track.id());
        match current_id {
            Some(current) if current == id => self.toggle().await,
            Some(_) => {
                let released = self.teardown_current().await;
                self.schedule_start(track, released);
            }
            None => match self.pending.as_mut() {
                Some(pending) => {
                    debug!(track_id = id, "Replacing pending track");
                    pending.track = track;
                }
                None => self.start_track(track).await,
            },
        }
    }

    async fn toggle(&mut self) {
        let Some(active) = self.current.as_ref() else {
            return;
        };
        let track = Arc::clone(&active.track);

        if track.status().is_running() {
            self.sampler.stop();
            if let Err(err) = active.handle.pause().await {
                self.route_bridge_error(&track, &err);
            }
            self.emit(PlaybackEvent::Paused {
                track_id: track.id(),
            });
        } else {
            if let Err(err) = active.handle.play().await {
                self.route_bridge_error(&track, &err);
            }
            self.sampler.start();
            self.emit(PlaybackEvent::Resumed {
                track_id: track.id(),
            });
        }
    }

    async fn pause(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(track_id = pending.track.id(), "Pause cancelled pending start");
        }

        let Some(active) = self.current.as_ref() else {
            return;
        };
        self.sampler.stop();
        if let Err(err) = active.handle.pause().await {
            self.route_bridge_error(&active.track, &err);
        }
        self.emit(PlaybackEvent::Paused {
            track_id: active.track.id(),
        });
    }

    async fn seek_to(&mut self, position: f64) {
        let Some(active) = self.current.as_ref() else {
            debug!("Seek without a current track ignored");
            return;
        };

        let position = if position.is_finite() {
            position.max(0.0)
        } else {
            0.0
        };

        let Ok(target) = Duration::try_from_secs_f64(position) else {
            let error = MediaError::new(
                MediaErrorCode::Unknown,
                format!("seek position out of range: {position}"),
            );
            self.route_error(&active.track, error);
            return;
        };

        match active.handle.seek_to(target).await {
            Ok(()) => {
                active.track.set_progress(position);
                self.emit(PlaybackEvent::Seeked {
                    track_id: active.track.id(),
                    position,
                });
            }
            Err(err) => self.route_bridge_error(&active.track, &err),
        }
    }

    /// Stop sampling, drop any pending start and release the handle without
    /// stopping it first.
    async fn destroy(&mut self) {
        self.sampler.stop();
        self.pending = None;

        if let Some(active) = self.current.take() {
            if let Err(err) = active.handle.release().await {
                warn!(track_id = active.track.id(), error = %err, "Release failed during destroy");
            }
            debug!(track_id = active.track.id(), handle = %active.handle_id, "Handle released by destroy");
        }

        self.events
            .emit(CoreEvent::Session(SessionEvent::Destroyed))
            .ok();
    }

    // ------------------------------------------------------------------------
    // Handle lifecycle
    // ------------------------------------------------------------------------

    async fn start_track(&mut self, track: Arc<Track>) {
        let handle_id = MediaHandleId::new();
        let notifier = MediaNotifier::new(handle_id, self.notice_tx.clone());

        // Older handles of this track must not write into its new state.
        let track_id = track.id();
        self.owners.retain(|_, owner| *owner != track_id);

        let handle = match self.engine.create(track.url(), notifier).await {
            Ok(handle) => handle,
            Err(err) => {
                warn!(track_id, url = %redact_url(track.url()), error = %err, "Failed to create media handle");
                self.route_bridge_error(&track, &err);
                return;
            }
        };

        self.owners.insert(handle_id, track_id);
        debug!(track_id, handle = %handle_id, url = %redact_url(track.url()), "Media handle created");

        if let Err(err) = handle.play().await {
            self.route_bridge_error(&track, &err);
        }

        self.current = Some(ActiveMedia {
            track,
            handle_id,
            handle,
        });
        self.sampler.start();
        self.emit(PlaybackEvent::Started { track_id });
    }

    /// Stop and release the current handle. Release happens even when stop
    /// fails. Returns the released handle id.
    async fn teardown_current(&mut self) -> Option<MediaHandleId> {
        let active = self.current.take()?;
        self.sampler.stop();

        if let Err(err) = active.handle.stop().await {
            self.route_bridge_error(&active.track, &err);
        }
        if let Err(err) = active.handle.release().await {
            warn!(track_id = active.track.id(), error = %err, "Release failed during track switch");
        }

        debug!(track_id = active.track.id(), handle = %active.handle_id, "Previous track torn down");
        self.emit(PlaybackEvent::Stopped {
            track_id: active.track.id(),
        });
        Some(active.handle_id)
    }

    fn schedule_start(&mut self, track: Arc<Track>, released: Option<MediaHandleId>) {
        let now = Instant::now();
        let (deadline, awaiting_release) = match self.settle {
            SwitchSettle::Delay(delay) => (now + delay, None),
            SwitchSettle::ReleaseAck { timeout } => (now + timeout, released),
        };

        debug!(track_id = track.id(), "Track start scheduled after switch");
        self.pending = Some(PendingStart {
            track,
            deadline,
            awaiting_release,
        });
    }

    async fn start_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.start_track(pending.track).await;
        }
    }

    /// Native completion of the current handle.
    async fn complete_current(&mut self) {
        let Some(active) = self.current.take() else {
            return;
        };
        self.sampler.stop();

        if let Err(err) = active.handle.release().await {
            warn!(track_id = active.track.id(), error = %err, "Release failed after completion");
        }

        info!(track_id = active.track.id(), "Track completed");
        self.finish_track(&active.track);
    }

    fn finish_track(&self, track: &Track) {
        track.reset();
        track.hooks().success();
        self.emit(PlaybackEvent::Completed {
            track_id: track.id(),
        });
    }

    // ------------------------------------------------------------------------
    // Notifications and ticks
    // ------------------------------------------------------------------------

    async fn handle_notice(&mut self, notice: MediaNotice) {
        let Some(&track_id) = self.owners.get(&notice.handle) else {
            debug!(handle = %notice.handle, "Ignoring notification from untracked handle");
            return;
        };
        let Some(track) = self.registry.get(track_id) else {
            return;
        };
        let is_current = self
            .current
            .as_ref()
            .is_some_and(|active| active.handle_id == notice.handle);

        match notice.notification {
            MediaNotification::StatusChanged(status) => {
                track.set_status(status);
                track.hooks().status_changed(status);
                self.emit(PlaybackEvent::StatusChanged { track_id, status });

                if is_current {
                    match status {
                        MediaStatus::Running => {
                            self.sampler.start();
                        }
                        MediaStatus::Paused | MediaStatus::Stopped | MediaStatus::None => {
                            self.sampler.stop();
                        }
                        MediaStatus::Starting => {}
                    }
                }
            }
            MediaNotification::Completed if is_current => self.complete_current().await,
            MediaNotification::Completed => self.finish_track(&track),
            MediaNotification::Error(error) => self.route_error(&track, error),
            MediaNotification::Released => {
                self.owners.remove(&notice.handle);
                let acknowledged = self
                    .pending
                    .as_ref()
                    .is_some_and(|pending| pending.awaiting_release == Some(notice.handle));
                if acknowledged {
                    debug!(handle = %notice.handle, "Release acknowledged");
                    self.start_pending().await;
                }
            }
        }
    }

    async fn sample_progress(&mut self) {
        let Some(active) = self.current.as_ref() else {
            self.sampler.stop();
            return;
        };

        let sample = sampler::sample(active.handle.as_ref(), &active.track.state()).await;
        if let Some(duration) = sample.duration {
            active.track.set_duration(duration);
        }
        if let Some(position) = sample.position {
            active.track.set_progress(position);
        }

        let state = active.track.state();
        active.track.hooks().progress(state.progress, state.duration);
        self.emit(PlaybackEvent::ProgressChanged {
            track_id: active.track.id(),
            progress: state.progress,
            duration: state.duration,
        });
    }
}

//! Track model: immutable descriptor, registration hooks and observable state.

use bridge_traits::media::{MediaError, MediaStatus, UNKNOWN_DURATION};
use core_runtime::events::TrackSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

pub use core_runtime::events::TrackId;

/// What a host supplies when registering a track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Playable media URL. Required; an empty value is refused at registration.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    /// Artwork URL, never interpreted.
    #[serde(default)]
    pub art: Option<String>,
}

impl TrackDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_art(mut self, art: impl Into<String>) -> Self {
        self.art = Some(art.into());
        self
    }

    pub(crate) fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Mutable playback fields of a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    pub status: MediaStatus,
    /// Seconds, never negative.
    pub progress: f64,
    /// Seconds, `-1.0` until the engine reports a length.
    pub duration: f64,
}

impl Default for TrackState {
    fn default() -> Self {
        Self {
            status: MediaStatus::None,
            progress: 0.0,
            duration: UNKNOWN_DURATION,
        }
    }
}

impl TrackState {
    pub fn duration_known(&self) -> bool {
        self.duration >= 0.0
    }
}

pub type SuccessHook = Arc<dyn Fn() + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&MediaError) + Send + Sync>;
pub type StatusHook = Arc<dyn Fn(MediaStatus) + Send + Sync>;
pub type ProgressHook = Arc<dyn Fn(f64, f64) + Send + Sync>;

/// Callbacks bound to a track at registration.
///
/// Hooks run on the session task, so they must return quickly and must not
/// block on the session.
#[derive(Clone, Default)]
pub struct TrackHooks {
    on_success: Option<SuccessHook>,
    on_error: Option<ErrorHook>,
    on_status_change: Option<StatusHook>,
    on_progress: Option<ProgressHook>,
}

impl TrackHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when playback of the track completes.
    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(hook));
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&MediaError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn on_status_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(MediaStatus) + Send + Sync + 'static,
    {
        self.on_status_change = Some(Arc::new(hook));
        self
    }

    /// Called with `(progress, duration)` on every sampler tick.
    pub fn on_progress<F>(mut self, hook: F) -> Self
    where
        F: Fn(f64, f64) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(hook));
        self
    }

    pub(crate) fn success(&self) {
        if let Some(hook) = &self.on_success {
            hook();
        }
    }

    pub(crate) fn error(&self, error: &MediaError) {
        if let Some(hook) = &self.on_error {
            hook(error);
        }
    }

    pub(crate) fn status_changed(&self, status: MediaStatus) {
        if let Some(hook) = &self.on_status_change {
            hook(status);
        }
    }

    pub(crate) fn progress(&self, progress: f64, duration: f64) {
        if let Some(hook) = &self.on_progress {
            hook(progress, duration);
        }
    }
}

impl fmt::Debug for TrackHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackHooks")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_status_change", &self.on_status_change.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// A registered track.
///
/// The id, descriptor and hooks never change after registration. The
/// [`TrackState`] is written only by the session and published through a
/// `watch` channel so any number of bindings can observe it.
pub struct Track {
    id: TrackId,
    descriptor: TrackDescriptor,
    hooks: TrackHooks,
    state: watch::Sender<TrackState>,
}

impl Track {
    pub(crate) fn new(id: TrackId, descriptor: TrackDescriptor, hooks: TrackHooks) -> Self {
        let (state, _) = watch::channel(TrackState::default());
        Self {
            id,
            descriptor,
            hooks,
            state,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn descriptor(&self) -> &TrackDescriptor {
        &self.descriptor
    }

    pub fn url(&self) -> &str {
        &self.descriptor.url
    }

    pub fn state(&self) -> TrackState {
        *self.state.borrow()
    }

    pub fn status(&self) -> MediaStatus {
        self.state.borrow().status
    }

    /// Receiver that observes every state change of this track.
    pub fn subscribe(&self) -> watch::Receiver<TrackState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        let state = self.state();
        TrackSnapshot {
            id: self.id,
            url: self.descriptor.url.clone(),
            title: self.descriptor.title.clone(),
            artist: self.descriptor.artist.clone(),
            art: self.descriptor.art.clone(),
            status: state.status,
            progress: state.progress,
            duration: state.duration,
        }
    }

    pub(crate) fn hooks(&self) -> &TrackHooks {
        &self.hooks
    }

    pub(crate) fn set_status(&self, status: MediaStatus) {
        self.state.send_modify(|state| state.status = status);
    }

    pub(crate) fn set_progress(&self, progress: f64) {
        self.state
            .send_modify(|state| state.progress = progress.max(0.0));
    }

    pub(crate) fn set_duration(&self, duration: f64) {
        self.state.send_modify(|state| state.duration = duration);
    }

    /// Back to idle after native completion. The duration stays known.
    pub(crate) fn reset(&self) {
        self.state.send_modify(|state| {
            state.status = MediaStatus::None;
            state.progress = 0.0;
        });
    }
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .field("state", &self.state())
            .finish()
    }
}

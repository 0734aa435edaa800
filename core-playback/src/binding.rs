//! UI binding contract.
//!
//! A [`TrackBinding`] is what a play button or list row holds: it registers one
//! track on mount, forwards transport gestures and destroys the session's
//! handle on unmount. A [`ProgressBinding`] renders a progress bar, either for
//! the track binding it is attached to or, when detached, for whichever track
//! was most recently announced through [`PlaybackEvent::TrackChanged`].

use std::sync::Arc;

use bridge_traits::media::MediaStatus;
use core_runtime::events::{CoreEvent, EventStream, PlaybackEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::Result;
use crate::format::{format_duration, format_time};
use crate::session::MediaSession;
use crate::track::{Track, TrackDescriptor, TrackHooks, TrackId, TrackState};

/// A mounted track owned by one UI element.
#[derive(Debug)]
pub struct TrackBinding {
    session: MediaSession,
    track: Arc<Track>,
    has_progress_bar: bool,
}

impl TrackBinding {
    /// Register `descriptor` with the session.
    ///
    /// `has_progress_bar` tells whether this element renders its own progress;
    /// when it does not, `play` announces the track to detached progress bars.
    ///
    /// # Errors
    ///
    /// [`crate::PlaybackError::MissingTrackUrl`] when the descriptor has no URL.
    pub fn mount(
        session: &MediaSession,
        descriptor: TrackDescriptor,
        hooks: TrackHooks,
        has_progress_bar: bool,
    ) -> Result<Self> {
        let id = session.register(descriptor, hooks)?;
        let track = session
            .registry()
            .get(id)
            .ok_or(crate::error::PlaybackError::TrackNotFound(id))?;

        Ok(Self {
            session: session.clone(),
            track,
            has_progress_bar,
        })
    }

    pub fn id(&self) -> TrackId {
        self.track.id()
    }

    pub fn track(&self) -> &Arc<Track> {
        &self.track
    }

    pub fn has_progress_bar(&self) -> bool {
        self.has_progress_bar
    }

    /// Play or toggle this track.
    ///
    /// Returns the track id, which is what the element needs to highlight
    /// itself as current.
    pub fn play(&self) -> Result<TrackId> {
        self.session.play(self.id())?;

        if !self.has_progress_bar {
            let event = PlaybackEvent::TrackChanged {
                track: self.track.snapshot(),
            };
            let receivers = self.session.events().emit(CoreEvent::Playback(event)).unwrap_or(0);
            debug!(track_id = self.id(), receivers, "Announced track change");
        }

        Ok(self.id())
    }

    pub fn pause(&self) -> Result<()> {
        self.session.pause()
    }

    pub fn seek_to(&self, position: f64) -> Result<()> {
        self.session.seek_to(position)
    }

    pub fn observe(&self) -> watch::Receiver<TrackState> {
        self.track.subscribe()
    }

    /// Progress bar bound to this track.
    pub fn progress_bar(&self) -> ProgressBinding {
        ProgressBinding::attached(&self.session, Arc::clone(&self.track))
    }

    /// Release whatever the session is playing, even if it is another track.
    pub fn unmount(self) -> Result<()> {
        debug!(track_id = self.id(), "Unmounting track binding");
        self.session.destroy()
    }
}

/// Read model behind a progress bar and its labels.
pub struct ProgressBinding {
    session: MediaSession,
    target: Option<Arc<Track>>,
    state: Option<watch::Receiver<TrackState>>,
    announcements: Option<EventStream>,
}

impl ProgressBinding {
    fn attached(session: &MediaSession, track: Arc<Track>) -> Self {
        let state = track.subscribe();
        Self {
            session: session.clone(),
            target: Some(track),
            state: Some(state),
            announcements: None,
        }
    }

    /// Progress bar with no track of its own. It follows
    /// [`PlaybackEvent::TrackChanged`] announcements made after this call.
    pub fn detached(session: &MediaSession) -> Self {
        let announcements = EventStream::new(session.events().subscribe()).filter(|event| {
            matches!(
                event,
                CoreEvent::Playback(PlaybackEvent::TrackChanged { .. })
            )
        });

        Self {
            session: session.clone(),
            target: None,
            state: None,
            announcements: Some(announcements),
        }
    }

    pub fn is_detached(&self) -> bool {
        self.announcements.is_some()
    }

    pub fn target(&self) -> Option<TrackId> {
        self.target.as_ref().map(|track| track.id())
    }

    /// Apply every announcement received so far without waiting.
    ///
    /// Returns the target after the update.
    pub fn refresh(&mut self) -> Option<TrackId> {
        loop {
            let Some(announcements) = self.announcements.as_mut() else {
                break;
            };
            match announcements.try_recv() {
                Some(Ok(event)) => self.retarget(&event),
                Some(Err(RecvError::Lagged(skipped))) => {
                    debug!(skipped, "Progress binding lagged behind announcements");
                }
                Some(Err(RecvError::Closed)) | None => break,
            }
        }
        self.target()
    }

    /// Wait for the next announcement and retarget to it.
    ///
    /// Returns `None` for attached bindings and once the session's event bus
    /// is gone.
    pub async fn follow(&mut self) -> Option<TrackId> {
        loop {
            let announcements = self.announcements.as_mut()?;
            match announcements.recv().await {
                Ok(event) => {
                    self.retarget(&event);
                    return self.target();
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Progress binding lagged behind announcements");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    fn retarget(&mut self, event: &CoreEvent) {
        let CoreEvent::Playback(PlaybackEvent::TrackChanged { track }) = event else {
            return;
        };
        match self.session.registry().get(track.id) {
            Some(next) => {
                self.state = Some(next.subscribe());
                self.target = Some(next);
            }
            None => warn!(track_id = track.id, "Announced track is not registered"),
        }
    }

    /// Current state of the target, or `None` without one.
    pub fn state(&self) -> Option<TrackState> {
        self.state.as_ref().map(|rx| *rx.borrow())
    }

    /// Wait until the target's state changes.
    pub async fn changed(&mut self) -> Option<TrackState> {
        let rx = self.state.as_mut()?;
        rx.changed().await.ok()?;
        let state = *rx.borrow_and_update();
        Some(state)
    }

    pub fn progress_label(&self) -> String {
        format_time(self.state().map_or(0.0, |state| state.progress))
    }

    pub fn duration_label(&self) -> String {
        self.state()
            .map(|state| format_duration(state.duration))
            .unwrap_or_default()
    }

    /// `"title - artist"`, or whichever of the two is present.
    pub fn info_label(&self) -> String {
        let Some(track) = &self.target else {
            return String::new();
        };
        let descriptor = track.descriptor();
        [descriptor.title.as_deref(), descriptor.artist.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" - ")
    }

    /// The slider only accepts input while the target is running.
    pub fn is_seekable(&self) -> bool {
        self.state()
            .is_some_and(|state| state.status == MediaStatus::Running)
    }

    /// Seek to `position` when the slider is released. Returns whether a seek
    /// was issued.
    pub fn release_slider(&self, position: f64) -> Result<bool> {
        if !self.is_seekable() {
            return Ok(false);
        }
        self.session.seek_to(position)?;
        Ok(true)
    }

    /// Release whatever the session is playing, like [`TrackBinding::unmount`].
    pub fn unmount(self) -> Result<()> {
        debug!(target_track = ?self.target(), "Unmounting progress binding");
        self.session.destroy()
    }
}

impl std::fmt::Debug for ProgressBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressBinding")
            .field("target", &self.target())
            .field("detached", &self.is_detached())
            .finish()
    }
}

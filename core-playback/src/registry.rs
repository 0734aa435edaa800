//! Append-only track registry.

use std::sync::Arc;

use core_runtime::events::{CoreEvent, EventBus, RegistryEvent, TrackSnapshot};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{PlaybackError, Result};
use crate::track::{Track, TrackDescriptor, TrackHooks, TrackId, TrackState};

/// Index-addressed store of registered tracks.
///
/// Ids are assigned in registration order starting at zero and stay valid for
/// the lifetime of the registry; entries are never removed. Clones share the
/// same storage.
#[derive(Clone, Default)]
pub struct TrackRegistry {
    tracks: Arc<RwLock<Vec<Arc<Track>>>>,
    events: Option<EventBus>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that reports registrations on `events`.
    pub fn with_events(events: EventBus) -> Self {
        Self {
            tracks: Arc::default(),
            events: Some(events),
        }
    }

    /// Register a track and return its id.
    ///
    /// The track starts idle with zero progress and unknown duration.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::MissingTrackUrl`] if the descriptor has no URL.
    pub fn register(&self, descriptor: TrackDescriptor, hooks: TrackHooks) -> Result<TrackId> {
        if !descriptor.has_url() {
            warn!(title = ?descriptor.title, "Refusing to register track without url");
            self.emit(RegistryEvent::Rejected {
                reason: PlaybackError::MissingTrackUrl.to_string(),
            });
            return Err(PlaybackError::MissingTrackUrl);
        }

        let title = descriptor.title.clone();
        let id = {
            let mut tracks = self.tracks.write();
            let id = tracks.len();
            tracks.push(Arc::new(Track::new(id, descriptor, hooks)));
            id
        };

        debug!(track_id = id, "Track registered");
        self.emit(RegistryEvent::TrackRegistered { track_id: id, title });
        Ok(id)
    }

    pub fn get(&self, id: TrackId) -> Option<Arc<Track>> {
        self.tracks.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tracks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.read().is_empty()
    }

    /// Watch a track's status, progress and duration.
    pub fn observe(&self, id: TrackId) -> Option<watch::Receiver<TrackState>> {
        self.get(id).map(|track| track.subscribe())
    }

    pub fn snapshot(&self, id: TrackId) -> Option<TrackSnapshot> {
        self.get(id).map(|track| track.snapshot())
    }

    pub fn snapshots(&self) -> Vec<TrackSnapshot> {
        self.tracks.read().iter().map(|track| track.snapshot()).collect()
    }

    fn emit(&self, event: RegistryEvent) {
        if let Some(events) = &self.events {
            events.emit(CoreEvent::Registry(event)).ok();
        }
    }
}

impl std::fmt::Debug for TrackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackRegistry")
            .field("len", &self.len())
            .finish()
    }
}

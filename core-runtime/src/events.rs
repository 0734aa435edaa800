//! # Event Bus System
//!
//! Broadcast channel that carries registry, session and playback events to
//! every interested UI binding, using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: Strongly-typed enum hierarchies per domain
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ TrackRegistry├──────────────>│           │     subscribe    ┌───────────────┐
//! └──────────────┘               │ EventBus  ├─────────────────>│ProgressBinding│
//! ┌──────────────┐     emit      │ (broadcast│                  └───────────────┘
//! │ MediaSession ├──────────────>│  channel) │     subscribe    ┌───────────────┐
//! └──────────────┘               │           ├─────────────────>│  Host UI      │
//! ┌──────────────┐     emit      │           │                  └───────────────┘
//! │ TrackBinding ├──────────────>│           │
//! └──────────────┘               └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Playback(PlaybackEvent::Paused { track_id: 0 }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.track_id(), Some(0));
//! # }
//! ```
//!
//! ## Track Changed Broadcasts
//!
//! [`PlaybackEvent::TrackChanged`] carries a full [`TrackSnapshot`]. It is
//! fire-and-forget: emitted at most once per play action, never replayed to
//! late subscribers. Progress displays that are not bound to a specific track
//! retarget themselves when they see it.
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   Non-fatal; progress ticks are the usual victims.
//! - **`RecvError::Closed`**: All senders have been dropped. Treat as shutdown.

use bridge_traits::media::{MediaErrorCode, MediaStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// One progress tick per second per active track keeps the default well
/// clear of lagging for interactive subscribers.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Registry index of a track.
pub type TrackId = usize;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Track registration events
    Registry(RegistryEvent),
    /// Session lifecycle events
    Session(SessionEvent),
    /// Per-track playback events
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Registry(e) => e.description(),
            CoreEvent::Session(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Registry(RegistryEvent::Rejected { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Started { .. })
            | CoreEvent::Playback(PlaybackEvent::Completed { .. })
            | CoreEvent::Session(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Track the event refers to, if any.
    pub fn track_id(&self) -> Option<TrackId> {
        match self {
            CoreEvent::Registry(RegistryEvent::TrackRegistered { track_id, .. }) => {
                Some(*track_id)
            }
            CoreEvent::Registry(RegistryEvent::Rejected { .. }) | CoreEvent::Session(_) => None,
            CoreEvent::Playback(e) => Some(e.track_id()),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Track Snapshot
// ============================================================================

/// Point-in-time copy of a track: descriptor plus mutable playback fields.
///
/// On [`PlaybackEvent::TrackChanged`] the copy is taken when the track is
/// announced, before the session has started it, so `status` and `progress`
/// hold the pre-play values. Observe the track itself for live state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackSnapshot {
    pub id: TrackId,
    pub url: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub art: Option<String>,
    pub status: MediaStatus,
    /// Last known position in seconds.
    pub progress: f64,
    /// Length in seconds, `-1.0` while unknown.
    pub duration: f64,
}

// ============================================================================
// Registry Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RegistryEvent {
    /// A track received an id.
    TrackRegistered {
        track_id: TrackId,
        title: Option<String>,
    },
    /// Registration was refused.
    Rejected {
        /// Human-readable reason (e.g. missing URL).
        reason: String,
    },
}

impl RegistryEvent {
    fn description(&self) -> &str {
        match self {
            RegistryEvent::TrackRegistered { .. } => "Track registered",
            RegistryEvent::Rejected { .. } => "Track registration rejected",
        }
    }
}

// ============================================================================
// Session Events
// ============================================================================

/// Lifecycle of the playback session itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// Session task is running and accepting commands.
    Ready {
        /// Whether track switches wait for a release acknowledgment.
        awaits_release_ack: bool,
    },
    /// Polling stopped and any handle was released by `destroy()`.
    Destroyed,
    /// Session task exited.
    Shutdown,
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::Ready { .. } => "Session ready",
            SessionEvent::Destroyed => "Session destroyed",
            SessionEvent::Shutdown => "Session shut down",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to audio playback of one track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A native handle was built and told to play.
    Started { track_id: TrackId },
    /// Playback paused by command.
    Paused { track_id: TrackId },
    /// Playback resumed after pause.
    Resumed { track_id: TrackId },
    /// The handle was stopped and released because another track was requested.
    Stopped { track_id: TrackId },
    /// Native completion; the track is no longer current.
    Completed { track_id: TrackId },
    /// The adapter reported a new transport status.
    StatusChanged {
        track_id: TrackId,
        status: MediaStatus,
    },
    /// Progress sample from the polling loop.
    ProgressChanged {
        track_id: TrackId,
        /// Seconds.
        progress: f64,
        /// Seconds, `-1.0` while unknown.
        duration: f64,
    },
    /// Seek forwarded to the native handle.
    Seeked { track_id: TrackId, position: f64 },
    /// Adapter or transport error routed to the track.
    Error {
        track_id: TrackId,
        code: MediaErrorCode,
        message: String,
    },
    /// A binding without its own progress display asked to play a track.
    /// Sent alongside the play request, not after the track starts.
    TrackChanged { track: TrackSnapshot },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::StatusChanged { .. } => "Playback status changed",
            PlaybackEvent::ProgressChanged { .. } => "Playback progress changed",
            PlaybackEvent::Seeked { .. } => "Playback position sought",
            PlaybackEvent::Error { .. } => "Playback error",
            PlaybackEvent::TrackChanged { .. } => "Current track changed",
        }
    }

    pub fn track_id(&self) -> TrackId {
        match self {
            PlaybackEvent::Started { track_id }
            | PlaybackEvent::Paused { track_id }
            | PlaybackEvent::Resumed { track_id }
            | PlaybackEvent::Stopped { track_id }
            | PlaybackEvent::Completed { track_id }
            | PlaybackEvent::StatusChanged { track_id, .. }
            | PlaybackEvent::ProgressChanged { track_id, .. }
            | PlaybackEvent::Seeked { track_id, .. }
            | PlaybackEvent::Error { track_id, .. } => *track_id,
            PlaybackEvent::TrackChanged { track } => track.id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every clone publishes to the same
/// subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; `SessionConfig` validation rejects that
    /// value before a bus is built from it.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribes to events that refer to a single track.
    pub fn subscribe_track(&self, track_id: TrackId) -> EventStream {
        EventStream::new(self.subscribe()).filter(move |event| event.track_id() == Some(track_id))
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    /// Bus with [`DEFAULT_EVENT_BUFFER_SIZE`] capacity.
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
///
/// let event_bus = EventBus::new(100);
/// let changes = EventStream::new(event_bus.subscribe()).filter(|event| {
///     matches!(event, CoreEvent::Playback(PlaybackEvent::TrackChanged { .. }))
/// });
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events that match `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: TrackId) -> TrackSnapshot {
        TrackSnapshot {
            id,
            url: "file:///music/a.mp3".to_string(),
            title: Some("Intro".to_string()),
            artist: Some("Band".to_string()),
            art: None,
            status: MediaStatus::Starting,
            progress: 0.0,
            duration: -1.0,
        }
    }

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_default_bus_holds_default_buffer() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        for _ in 0..DEFAULT_EVENT_BUFFER_SIZE {
            bus.emit(CoreEvent::Session(SessionEvent::Destroyed)).unwrap();
        }

        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Session(SessionEvent::Destroyed)
        );
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        let event = CoreEvent::Session(SessionEvent::Destroyed);

        assert!(bus.emit(event).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Playback(PlaybackEvent::Started { track_id: 2 });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Playback(PlaybackEvent::TrackChanged { .. })));

        bus.emit(CoreEvent::Playback(PlaybackEvent::Paused { track_id: 0 }))
            .ok();
        let changed = CoreEvent::Playback(PlaybackEvent::TrackChanged {
            track: snapshot(1),
        });
        bus.emit(changed.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), changed);
    }

    #[tokio::test]
    async fn test_subscribe_track_skips_other_tracks() {
        let bus = EventBus::new(10);
        let mut stream = bus.subscribe_track(1);

        bus.emit(CoreEvent::Playback(PlaybackEvent::Started { track_id: 0 }))
            .ok();
        bus.emit(CoreEvent::Session(SessionEvent::Destroyed)).ok();
        let wanted = CoreEvent::Playback(PlaybackEvent::ProgressChanged {
            track_id: 1,
            progress: 3.0,
            duration: 120.0,
        });
        bus.emit(wanted.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), wanted);
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_try_recv_reports_lag() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());

        for track_id in 0..5 {
            bus.emit(CoreEvent::Playback(PlaybackEvent::Paused { track_id }))
                .ok();
        }

        assert!(matches!(stream.try_recv(), Some(Err(RecvError::Lagged(3)))));
    }

    #[tokio::test]
    async fn test_stream_closed_when_bus_dropped() {
        let bus = EventBus::new(4);
        let mut stream = EventStream::new(bus.subscribe());
        drop(bus);

        assert!(matches!(stream.recv().await, Err(RecvError::Closed)));
    }

    #[test]
    fn test_event_severity() {
        let error = CoreEvent::Playback(PlaybackEvent::Error {
            track_id: 0,
            code: MediaErrorCode::Network,
            message: "timeout".to_string(),
        });
        assert_eq!(error.severity(), EventSeverity::Error);

        let rejected = CoreEvent::Registry(RegistryEvent::Rejected {
            reason: "missing url".to_string(),
        });
        assert_eq!(rejected.severity(), EventSeverity::Warning);
        assert_eq!(rejected.track_id(), None);

        let tick = CoreEvent::Playback(PlaybackEvent::ProgressChanged {
            track_id: 0,
            progress: 1.0,
            duration: -1.0,
        });
        assert_eq!(tick.severity(), EventSeverity::Debug);
        assert_eq!(tick.description(), "Playback progress changed");
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Playback(PlaybackEvent::TrackChanged {
            track: snapshot(4),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Playback");
        assert_eq!(json["payload"]["event"], "TrackChanged");
        assert_eq!(json["payload"]["track"]["status"], "starting");

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.track_id(), Some(4));
    }
}

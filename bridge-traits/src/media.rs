//! Native media engine bridge traits.
//!
//! A host platform wraps its device media player (AVPlayer, MediaPlayer,
//! HTMLAudioElement, ...) behind [`MediaEngine`]. The engine builds one
//! [`MediaHandle`] per URL; the core owns that handle until it is released.
//!
//! Engines never call back into the core directly. Every asynchronous event a
//! handle produces (status change, completion, error, release) is pushed
//! through the [`MediaNotifier`] handed to [`MediaEngine::create`], tagged with
//! the handle's [`MediaHandleId`] so the core can discard notifications from
//! handles it no longer tracks.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Sentinel reported by [`MediaHandle::duration`] while the length is unknown.
pub const UNKNOWN_DURATION: f64 = -1.0;

/// Transport status of a native media handle.
///
/// The numeric codes are part of the host contract and are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    #[default]
    None,
    Starting,
    Running,
    Paused,
    Stopped,
}

impl MediaStatus {
    /// Numeric status code (`0..=4`).
    pub fn code(self) -> u8 {
        match self {
            MediaStatus::None => 0,
            MediaStatus::Starting => 1,
            MediaStatus::Running => 2,
            MediaStatus::Paused => 3,
            MediaStatus::Stopped => 4,
        }
    }

    /// Parse a numeric status code reported by a host engine.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MediaStatus::None),
            1 => Some(MediaStatus::Starting),
            2 => Some(MediaStatus::Running),
            3 => Some(MediaStatus::Paused),
            4 => Some(MediaStatus::Stopped),
            _ => None,
        }
    }

    pub fn is_running(self) -> bool {
        self == MediaStatus::Running
    }
}

impl fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MediaStatus::None => "none",
            MediaStatus::Starting => "starting",
            MediaStatus::Running => "running",
            MediaStatus::Paused => "paused",
            MediaStatus::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Error category reported by a native engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorCode {
    /// Fetching the media was aborted by the user agent.
    Aborted,
    /// A network error interrupted loading.
    Network,
    /// The media could not be decoded.
    Decode,
    /// The source format is not supported.
    NotSupported,
    Unknown,
}

impl MediaErrorCode {
    pub fn code(self) -> u8 {
        match self {
            MediaErrorCode::Aborted => 1,
            MediaErrorCode::Network => 2,
            MediaErrorCode::Decode => 3,
            MediaErrorCode::NotSupported => 4,
            MediaErrorCode::Unknown => 0,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => MediaErrorCode::Aborted,
            2 => MediaErrorCode::Network,
            3 => MediaErrorCode::Decode,
            4 => MediaErrorCode::NotSupported,
            _ => MediaErrorCode::Unknown,
        }
    }
}

/// Error payload delivered to a track's error hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaError {
    pub code: MediaErrorCode,
    pub message: String,
}

impl MediaError {
    pub fn new(code: MediaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({}): {}", self.code, self.code.code(), self.message)
    }
}

impl From<&crate::error::BridgeError> for MediaError {
    fn from(err: &crate::error::BridgeError) -> Self {
        use crate::error::BridgeError;
        let code = match err {
            BridgeError::InvalidSource(_) => MediaErrorCode::NotSupported,
            BridgeError::Io(_) => MediaErrorCode::Network,
            BridgeError::NotAvailable(_)
            | BridgeError::OperationFailed(_)
            | BridgeError::Released => MediaErrorCode::Unknown,
        };
        MediaError::new(code, err.to_string())
    }
}

/// Identifier assigned by the core to every handle it asks an engine to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaHandleId(Uuid);

impl MediaHandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MediaHandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaHandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Asynchronous event raised by a native handle.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaNotification {
    /// The handle moved to a new transport status.
    StatusChanged(MediaStatus),
    /// Playback finished, either at the natural end or after `stop()`.
    Completed,
    /// The engine reported a failure.
    Error(MediaError),
    /// Native resources were freed. This is the last notification a handle
    /// sends; engines that emit it advertise
    /// [`MediaEngine::acknowledges_release`].
    Released,
}

/// A notification tagged with the handle that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaNotice {
    pub handle: MediaHandleId,
    pub notification: MediaNotification,
}

/// Sending half handed to an engine for one handle.
///
/// Sends never block and never fail loudly: once the core has dropped the
/// receiving side, notifications are discarded.
#[derive(Debug, Clone)]
pub struct MediaNotifier {
    handle: MediaHandleId,
    tx: mpsc::UnboundedSender<MediaNotice>,
}

impl MediaNotifier {
    pub fn new(handle: MediaHandleId, tx: mpsc::UnboundedSender<MediaNotice>) -> Self {
        Self { handle, tx }
    }

    /// Handle this notifier reports for.
    pub fn handle_id(&self) -> MediaHandleId {
        self.handle
    }

    /// Push a raw notification. Returns `false` when nobody is listening.
    pub fn notify(&self, notification: MediaNotification) -> bool {
        self.tx
            .send(MediaNotice {
                handle: self.handle,
                notification,
            })
            .is_ok()
    }

    pub fn status(&self, status: MediaStatus) -> bool {
        self.notify(MediaNotification::StatusChanged(status))
    }

    pub fn completed(&self) -> bool {
        self.notify(MediaNotification::Completed)
    }

    pub fn error(&self, error: MediaError) -> bool {
        self.notify(MediaNotification::Error(error))
    }

    pub fn released(&self) -> bool {
        self.notify(MediaNotification::Released)
    }
}

/// A single native player bound to one URL.
///
/// Commands are fire-and-forget from the engine's point of view: the
/// resulting status transitions arrive later through the [`MediaNotifier`].
#[async_trait::async_trait]
pub trait MediaHandle: Send + Sync {
    /// Start or resume playback.
    async fn play(&self) -> Result<()>;

    /// Pause without releasing native resources.
    async fn pause(&self) -> Result<()>;

    /// Stop playback. Engines report completion afterwards.
    async fn stop(&self) -> Result<()>;

    /// Seek to an absolute position from the start of the media.
    async fn seek_to(&self, position: Duration) -> Result<()>;

    /// Current position in seconds. A negative value means "not known yet".
    async fn current_position(&self) -> Result<f64>;

    /// Total length in seconds, or [`UNKNOWN_DURATION`].
    async fn duration(&self) -> f64;

    /// Free native resources. The handle must not be used afterwards.
    async fn release(&self) -> Result<()>;
}

/// Factory for native media handles.
#[async_trait::async_trait]
pub trait MediaEngine: Send + Sync {
    /// Whether the device media capability exists on this host.
    fn is_available(&self) -> bool {
        true
    }

    /// Whether handles built by this engine emit
    /// [`MediaNotification::Released`] once their resources are freed.
    fn acknowledges_release(&self) -> bool {
        false
    }

    /// Build a handle for `url`. Notifications for the new handle must be
    /// sent through `notifier`.
    async fn create(&self, url: &str, notifier: MediaNotifier) -> Result<Box<dyn MediaHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_stable() {
        let all = [
            MediaStatus::None,
            MediaStatus::Starting,
            MediaStatus::Running,
            MediaStatus::Paused,
            MediaStatus::Stopped,
        ];
        for (expected, status) in all.iter().enumerate() {
            assert_eq!(status.code() as usize, expected);
            assert_eq!(MediaStatus::from_code(status.code()), Some(*status));
        }
        assert_eq!(MediaStatus::from_code(9), None);
        assert_eq!(MediaStatus::default(), MediaStatus::None);
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&MediaStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
        let back: MediaStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(back, MediaStatus::Paused);
    }

    #[test]
    fn error_codes_fall_back_to_unknown() {
        assert_eq!(MediaErrorCode::from_code(2), MediaErrorCode::Network);
        assert_eq!(MediaErrorCode::from_code(42), MediaErrorCode::Unknown);
    }

    #[test]
    fn handle_id_is_unique() {
        let a = MediaHandleId::new();
        let b = MediaHandleId::new();
        assert_ne!(a, b);
        assert_eq!(a, MediaHandleId::from_uuid(*a.as_uuid()));
    }

    #[tokio::test]
    async fn notifier_tags_notices_with_handle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = MediaHandleId::new();
        let notifier = MediaNotifier::new(id, tx);

        assert!(notifier.status(MediaStatus::Running));
        assert!(notifier.released());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.handle, id);
        assert_eq!(
            first.notification,
            MediaNotification::StatusChanged(MediaStatus::Running)
        );
        assert_eq!(
            rx.recv().await.unwrap().notification,
            MediaNotification::Released
        );
    }

    #[test]
    fn notifier_reports_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let notifier = MediaNotifier::new(MediaHandleId::new(), tx);
        assert!(!notifier.completed());
    }

    #[test]
    fn bridge_errors_map_to_media_codes() {
        let err = crate::error::BridgeError::InvalidSource("ftp://x".into());
        let media: MediaError = (&err).into();
        assert_eq!(media.code, MediaErrorCode::NotSupported);
        assert!(media.message.contains("ftp://x"));
    }
}

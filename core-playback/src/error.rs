//! # Playback Error Types

use bridge_traits::BridgeError;
use thiserror::Error;

use crate::track::TrackId;

/// Errors surfaced synchronously by the registry and the session handle.
///
/// Transport failures are not raised here; they reach the owning track's
/// error hook and the event bus instead.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// Registration was attempted without a playable URL.
    #[error("Track registration requires a non-empty url")]
    MissingTrackUrl,

    /// No track is registered under this id.
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The host has no usable media engine.
    #[error("Media engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The session task has exited; commands can no longer be delivered.
    #[error("Playback session closed")]
    SessionClosed,

    // ========================================================================
    // Propagated Errors
    // ========================================================================
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl PlaybackError {
    /// Returns `true` if retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::Bridge(BridgeError::Io(_))
                | PlaybackError::Bridge(BridgeError::OperationFailed(_))
        )
    }

    /// Returns `true` if the error means no playback is possible on this host.
    pub fn is_capability_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::EngineUnavailable(_)
                | PlaybackError::Bridge(BridgeError::NotAvailable(_))
                | PlaybackError::Runtime(core_runtime::Error::CapabilityMissing { .. })
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host platform implements for the
//! audio session core.
//!
//! ## Traits
//!
//! ### Media
//! - [`MediaEngine`](media::MediaEngine) - Builds native media handles from URLs
//! - [`MediaHandle`](media::MediaHandle) - Transport commands and position queries for one handle
//! - [`MediaNotifier`](media::MediaNotifier) - Channel a handle reports status, completion and errors through
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop` (virtual engine) | ✅ |
//! | iOS      | host app (AVPlayer) | 📋 Planned |
//! | Android  | host app (MediaPlayer) | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! The core refuses to start a session when no engine was injected, or when
//! the injected engine reports [`MediaEngine::is_available`] as `false`:
//!
//! ```ignore
//! let engine = config.engine
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "MediaEngine".to_string(),
//!         message: "No media engine provided. \
//!                  Desktop: enable the desktop-shims feature. \
//!                  Mobile: inject the platform media adapter.".to_string()
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared with the
//! session task.

pub mod error;
pub mod logging;
pub mod media;

pub use error::BridgeError;

pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{
    MediaEngine, MediaError, MediaErrorCode, MediaHandle, MediaHandleId, MediaNotice,
    MediaNotification, MediaNotifier, MediaStatus, UNKNOWN_DURATION,
};

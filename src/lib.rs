//! Workspace façade crate.
//!
//! Re-exports the audio session crates so host applications can depend on
//! `audio-session-workspace` alone. The `desktop-shims` feature (default)
//! compiles in the virtual media engine and makes it the fallback engine for
//! [`SessionConfig`](core_runtime::SessionConfig).

pub use bridge_traits;
pub use core_playback;
pub use core_runtime;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;

pub use core_playback::{
    format_duration, format_time, MediaSession, PlaybackError, ProgressBinding, TrackBinding,
    TrackDescriptor, TrackHooks, TrackRegistry,
};
pub use core_runtime::{EventBus, SessionConfig};

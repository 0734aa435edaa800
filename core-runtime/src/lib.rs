//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the audio session crates:
//! - Logging and tracing infrastructure
//! - Session configuration
//! - Event bus system
//!
//! The session itself lives in `core-playback`; this crate holds the pieces
//! hosts configure before a session exists.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{SessionConfig, SessionConfigBuilder, SwitchSettle};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, PlaybackEvent, TrackId, TrackSnapshot};

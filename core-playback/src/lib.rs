//! # Playback Session Module
//!
//! Single-track audio session over a host media engine.
//!
//! ## Overview
//!
//! This module handles:
//! - Track registration and observable per-track state
//! - The playback session: play/toggle, pause, seek, switch and teardown
//! - Progress polling of the active handle
//! - UI bindings for play buttons and progress bars
//! - `MM:SS` display formatting
//!
//! Audio decoding and output belong to the engine behind
//! [`bridge_traits::media::MediaEngine`].

pub mod binding;
pub mod error;
pub mod format;
pub mod registry;
mod sampler;
pub mod session;
pub mod track;

pub use binding::{ProgressBinding, TrackBinding};
pub use error::{PlaybackError, Result};
pub use format::{format_duration, format_time};
pub use registry::TrackRegistry;
pub use session::{MediaSession, SessionSnapshot};
pub use track::{Track, TrackDescriptor, TrackHooks, TrackId, TrackState};

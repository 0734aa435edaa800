//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux) and headless test hosts.
//!
//! ## Overview
//!
//! - `MediaEngine` via [`VirtualMediaEngine`], a clock-driven engine that
//!   honours the full notification contract without producing sound
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::VirtualMediaEngine;
//! use core_runtime::config::SessionConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let engine = VirtualMediaEngine::new();
//! engine.set_track_length("intro.mp3", Duration::from_secs(42));
//!
//! let config = SessionConfig::builder()
//!     .engine(Arc::new(engine))
//!     .build()?;
//! ```

mod media;

pub use media::{VirtualMediaEngine, DEFAULT_TRACK_LENGTH};

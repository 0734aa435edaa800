//! # Session Configuration Module
//!
//! Builder-based configuration for the playback session.
//!
//! ## Overview
//!
//! [`SessionConfig`] holds the injected media engine and the timing knobs the
//! session uses. The builder fails fast when the engine is missing, so a host
//! never ends up with a session that cannot play anything.
//!
//! ## Required Dependencies
//!
//! - `MediaEngine` - builds native media handles. With the `desktop-shims`
//!   feature the virtual engine from `bridge-desktop` is injected when none is
//!   provided.
//!
//! ## Track Switch Settling
//!
//! When a different track is requested while one is active, the old handle is
//! stopped and released before the new one is built. The session then waits
//! for a [`SwitchSettle`] step before creating the next handle:
//!
//! - [`SwitchSettle::Delay`] waits a fixed time (default 1 s).
//! - [`SwitchSettle::ReleaseAck`] waits for the engine to report the old
//!   handle as released, up to a timeout.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::SessionConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = SessionConfig::builder()
//!     .engine(Arc::new(MyMediaEngine))
//!     .poll_interval(Duration::from_millis(500))
//!     .await_release_ack(Duration::from_secs(2))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::MediaEngine;
use std::sync::Arc;
use std::time::Duration;

/// Default progress sampling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default wait between tearing down one track and starting the next.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);
const MAX_SETTLE: Duration = Duration::from_secs(30);

/// How the session waits for the previous handle before starting a new track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchSettle {
    /// Wait a fixed amount of time.
    Delay(Duration),
    /// Wait until the engine acknowledges the release, or until `timeout`.
    ReleaseAck { timeout: Duration },
}

impl SwitchSettle {
    /// Upper bound on how long a switch waits.
    pub fn max_wait(&self) -> Duration {
        match *self {
            SwitchSettle::Delay(delay) => delay,
            SwitchSettle::ReleaseAck { timeout } => timeout,
        }
    }
}

impl Default for SwitchSettle {
    fn default() -> Self {
        SwitchSettle::Delay(DEFAULT_SETTLE_DELAY)
    }
}

/// Configuration for a playback session.
///
/// Use [`SessionConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct SessionConfig {
    /// Native media engine (required)
    pub engine: Arc<dyn MediaEngine>,

    /// Period of the progress sampler
    pub poll_interval: Duration,

    /// Track switch policy
    pub switch_settle: SwitchSettle,

    /// Capacity of the event bus built for this session
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("engine", &"MediaEngine { ... }")
            .field("poll_interval", &self.poll_interval)
            .field("switch_settle", &self.switch_settle)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Poll interval is in `(0, 60s]`
    /// - Switch settle wait is at most 30s
    /// - Event buffer is non-empty
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::Config(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if self.poll_interval > MAX_POLL_INTERVAL {
            return Err(Error::Config(
                "Poll interval exceeds maximum of 60 seconds".to_string(),
            ));
        }

        if self.switch_settle.max_wait() > MAX_SETTLE {
            return Err(Error::Config(
                "Track switch settle time exceeds maximum of 30 seconds".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaEngine".to_string(),
        message: "A MediaEngine implementation is required to build playback handles. \
                 Desktop: enable the 'desktop-shims' feature to use the virtual engine. \
                 Mobile: inject the platform media adapter (AVPlayer/MediaPlayer)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_engine() -> Result<Arc<dyn MediaEngine>> {
    use bridge_desktop::VirtualMediaEngine;

    let engine: Arc<dyn MediaEngine> = Arc::new(VirtualMediaEngine::new());
    Ok(engine)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_engine() -> Result<Arc<dyn MediaEngine>> {
    Err(engine_missing_error())
}

/// Builder for constructing [`SessionConfig`] instances.
#[derive(Default)]
pub struct SessionConfigBuilder {
    engine: Option<Arc<dyn MediaEngine>>,
    poll_interval: Option<Duration>,
    switch_settle: Option<SwitchSettle>,
    event_buffer_size: Option<usize>,
}

impl SessionConfigBuilder {
    /// Sets the media engine implementation (required).
    pub fn engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Sets the progress sampling period.
    ///
    /// Default: 1 second
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Waits a fixed `delay` between tearing down one track and starting the
    /// next.
    ///
    /// Default: 1 second
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.switch_settle = Some(SwitchSettle::Delay(delay));
        self
    }

    /// Waits for the engine's release acknowledgment instead of a fixed delay.
    ///
    /// `timeout` bounds the wait. Engines that never acknowledge releases
    /// degrade to a fixed delay of `timeout`.
    pub fn await_release_ack(mut self, timeout: Duration) -> Self {
        self.switch_settle = Some(SwitchSettle::ReleaseAck { timeout });
        self
    }

    pub fn switch_settle(mut self, settle: SwitchSettle) -> Self {
        self.switch_settle = Some(settle);
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `SessionConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no engine was provided and no
    ///   desktop default is compiled in
    /// - [`Error::Config`] when a timing value is out of range
    pub fn build(self) -> Result<SessionConfig> {
        let engine = match self.engine {
            Some(engine) => engine,
            None => provide_default_engine()?,
        };

        let config = SessionConfig {
            engine,
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            switch_settle: self.switch_settle.unwrap_or_default(),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::media::{MediaHandle, MediaNotifier};
    use bridge_traits::BridgeError;

    struct MockEngine;

    #[async_trait]
    impl MediaEngine for MockEngine {
        async fn create(
            &self,
            url: &str,
            _notifier: MediaNotifier,
        ) -> BridgeResult<Box<dyn MediaHandle>> {
            Err(BridgeError::InvalidSource(url.to_string()))
        }
    }

    fn builder() -> SessionConfigBuilder {
        SessionConfig::builder().engine(Arc::new(MockEngine))
    }

    #[test]
    fn test_build_with_defaults() {
        let config = builder().build().unwrap();

        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.switch_settle, SwitchSettle::Delay(DEFAULT_SETTLE_DELAY));
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_engine() {
        let result = SessionConfig::builder().build();

        let err = result.unwrap_err();
        assert!(matches!(err, Error::CapabilityMissing { .. }));
        let err_msg = err.to_string();
        assert!(err_msg.contains("MediaEngine"));
        assert!(err_msg.contains("desktop-shims"));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_default_engine() {
        let config = SessionConfig::builder().build().unwrap();
        assert!(config.engine.is_available());
        assert!(config.engine.acknowledges_release());
    }

    #[test]
    fn test_release_ack_policy() {
        let config = builder()
            .await_release_ack(Duration::from_secs(2))
            .build()
            .unwrap();

        assert_eq!(
            config.switch_settle,
            SwitchSettle::ReleaseAck {
                timeout: Duration::from_secs(2)
            }
        );
        assert_eq!(config.switch_settle.max_wait(), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_settle_delay_is_allowed() {
        let config = builder().settle_delay(Duration::ZERO).build().unwrap();
        assert_eq!(config.switch_settle, SwitchSettle::Delay(Duration::ZERO));
    }

    #[test]
    fn test_validate_poll_interval() {
        let err = builder()
            .poll_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Poll interval must be greater than 0"));

        let err = builder()
            .poll_interval(Duration::from_secs(61))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("maximum of 60 seconds"));
    }

    #[test]
    fn test_validate_settle_bounds() {
        let err = builder()
            .await_release_ack(Duration::from_secs(31))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("settle time"));
    }

    #[test]
    fn test_validate_event_buffer() {
        let err = builder().event_buffer_size(0).build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_debug_hides_engine() {
        let config = builder().build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("MediaEngine { ... }"));
        assert!(rendered.contains("poll_interval"));
    }
}

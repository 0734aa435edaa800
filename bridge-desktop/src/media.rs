//! Virtual media engine for desktop and headless hosts.
//!
//! Handles advance a clock-driven playhead instead of decoding audio. They
//! follow the same notification contract as device engines: `Starting` and
//! `Running` on play, `Paused` on pause, `Stopped` followed by completion on
//! stop or at the end of the track, and a final `Released`.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{MediaEngine, MediaHandle, MediaNotifier, MediaStatus, UNKNOWN_DURATION},
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Length given to URLs without an explicit entry.
pub const DEFAULT_TRACK_LENGTH: Duration = Duration::from_secs(180);

/// Media engine whose handles play silence on a virtual clock.
#[derive(Clone)]
pub struct VirtualMediaEngine {
    default_length: Duration,
    lengths: Arc<RwLock<HashMap<String, Duration>>>,
}

impl VirtualMediaEngine {
    pub fn new() -> Self {
        Self::with_default_length(DEFAULT_TRACK_LENGTH)
    }

    pub fn with_default_length(length: Duration) -> Self {
        Self {
            default_length: length,
            lengths: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register the length reported for `url`.
    pub fn set_track_length(&self, url: impl Into<String>, length: Duration) {
        self.lengths.write().insert(url.into(), length);
    }

    fn length_for(&self, url: &str) -> Duration {
        self.lengths
            .read()
            .get(url)
            .copied()
            .unwrap_or(self.default_length)
    }
}

impl Default for VirtualMediaEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaEngine for VirtualMediaEngine {
    fn acknowledges_release(&self) -> bool {
        true
    }

    async fn create(&self, url: &str, notifier: MediaNotifier) -> Result<Box<dyn MediaHandle>> {
        if url.trim().is_empty() {
            return Err(BridgeError::InvalidSource("empty media url".to_string()));
        }

        let length = self.length_for(url);
        debug!(handle = %notifier.handle_id(), length_secs = length.as_secs_f64(), "Virtual handle created");

        Ok(Box::new(VirtualMediaHandle {
            length,
            notifier,
            playhead: Arc::new(Mutex::new(Playhead::default())),
        }))
    }
}

#[derive(Default)]
struct Playhead {
    /// Position accumulated before `started_at`.
    offset: Duration,
    /// Set while running.
    started_at: Option<Instant>,
    status: MediaStatus,
    /// Length is only reported once playback has started.
    loaded: bool,
    released: bool,
    end_of_track: Option<CancellationToken>,
}

impl Playhead {
    fn position(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(started) => self.offset + now.saturating_duration_since(started),
            None => self.offset,
        }
    }

    fn cancel_end_of_track(&mut self) {
        if let Some(token) = self.end_of_track.take() {
            token.cancel();
        }
    }
}

struct VirtualMediaHandle {
    length: Duration,
    notifier: MediaNotifier,
    playhead: Arc<Mutex<Playhead>>,
}

impl VirtualMediaHandle {
    fn ensure_live(playhead: &Playhead) -> Result<()> {
        if playhead.released {
            Err(BridgeError::Released)
        } else {
            Ok(())
        }
    }

    /// Arm the end-of-track timer for the remaining length. Caller holds the lock.
    fn schedule_end(&self, playhead: &mut Playhead, now: Instant) {
        playhead.cancel_end_of_track();

        let remaining = self.length.saturating_sub(playhead.position(now));
        let token = CancellationToken::new();
        playhead.end_of_track = Some(token.clone());

        let shared = Arc::clone(&self.playhead);
        let notifier = self.notifier.clone();
        let length = self.length;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(remaining) => {
                    {
                        let mut playhead = shared.lock();
                        if token.is_cancelled() {
                            return;
                        }
                        playhead.end_of_track = None;
                        playhead.started_at = None;
                        playhead.offset = length;
                        playhead.status = MediaStatus::Stopped;
                    }
                    trace!(handle = %notifier.handle_id(), "Virtual handle reached end of track");
                    notifier.status(MediaStatus::Stopped);
                    notifier.completed();
                }
            }
        });
    }
}

#[async_trait]
impl MediaHandle for VirtualMediaHandle {
    async fn play(&self) -> Result<()> {
        let now = Instant::now();
        {
            let mut playhead = self.playhead.lock();
            Self::ensure_live(&playhead)?;
            if playhead.status == MediaStatus::Running {
                return Ok(());
            }
            if playhead.position(now) >= self.length {
                playhead.offset = Duration::ZERO;
            }
            playhead.loaded = true;
            playhead.started_at = Some(now);
            playhead.status = MediaStatus::Running;
            self.schedule_end(&mut playhead, now);
        }

        self.notifier.status(MediaStatus::Starting);
        self.notifier.status(MediaStatus::Running);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let now = Instant::now();
        {
            let mut playhead = self.playhead.lock();
            Self::ensure_live(&playhead)?;
            playhead.cancel_end_of_track();
            playhead.offset = playhead.position(now);
            playhead.started_at = None;
            playhead.status = MediaStatus::Paused;
        }

        self.notifier.status(MediaStatus::Paused);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        {
            let mut playhead = self.playhead.lock();
            Self::ensure_live(&playhead)?;
            playhead.cancel_end_of_track();
            playhead.offset = Duration::ZERO;
            playhead.started_at = None;
            playhead.status = MediaStatus::Stopped;
        }

        self.notifier.status(MediaStatus::Stopped);
        self.notifier.completed();
        Ok(())
    }

    async fn seek_to(&self, position: Duration) -> Result<()> {
        let now = Instant::now();
        let mut playhead = self.playhead.lock();
        Self::ensure_live(&playhead)?;

        playhead.offset = position.min(self.length);
        if playhead.started_at.is_some() {
            playhead.started_at = Some(now);
            self.schedule_end(&mut playhead, now);
        }
        Ok(())
    }

    async fn current_position(&self) -> Result<f64> {
        let playhead = self.playhead.lock();
        Self::ensure_live(&playhead)?;
        if !playhead.loaded {
            return Ok(-1.0);
        }
        Ok(playhead.position(Instant::now()).min(self.length).as_secs_f64())
    }

    async fn duration(&self) -> f64 {
        if self.playhead.lock().loaded {
            self.length.as_secs_f64()
        } else {
            UNKNOWN_DURATION
        }
    }

    async fn release(&self) -> Result<()> {
        {
            let mut playhead = self.playhead.lock();
            Self::ensure_live(&playhead)?;
            playhead.cancel_end_of_track();
            playhead.started_at = None;
            playhead.released = true;
        }

        debug!(handle = %self.notifier.handle_id(), "Virtual handle released");
        self.notifier.released();
        Ok(())
    }
}

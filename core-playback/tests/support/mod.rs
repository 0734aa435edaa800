//! Scripted media engine shared by the session and binding tests.
//!
//! Every engine call is recorded in order so tests can assert teardown
//! sequencing, and the number of unreleased handles is tracked to check that
//! at most one native handle is ever live.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::media::{
    MediaEngine, MediaError, MediaHandle, MediaNotification, MediaNotifier, MediaStatus,
};
use core_playback::{MediaSession, TrackHooks};
use core_runtime::SessionConfig;
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(String),
    Play(usize),
    Pause(usize),
    Stop(usize),
    Seek(usize, Duration),
    Release(usize),
}

#[derive(Default)]
struct Script {
    calls: Vec<Call>,
    notifiers: Vec<MediaNotifier>,
    started: Vec<bool>,
    live: usize,
    max_live: usize,
    position: f64,
    duration: f64,
    silent: bool,
    fail_create: bool,
    fail_stop: bool,
    fail_seek: bool,
}

#[derive(Clone)]
pub struct ScriptedEngine {
    script: Arc<Mutex<Script>>,
    available: bool,
    acknowledges: bool,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                duration: -1.0,
                ..Default::default()
            })),
            available: true,
            acknowledges: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Engine that reports `Released` after every release.
    pub fn acknowledging() -> Self {
        Self {
            acknowledges: true,
            ..Self::new()
        }
    }

    /// No automatic status notifications on play, pause or stop.
    pub fn silent(self) -> Self {
        self.script.lock().silent = true;
        self
    }

    pub fn fail_create(&self) {
        self.script.lock().fail_create = true;
    }

    pub fn fail_stop(&self) {
        self.script.lock().fail_stop = true;
    }

    pub fn fail_seek(&self) {
        self.script.lock().fail_seek = true;
    }

    pub fn set_position(&self, position: f64) {
        self.script.lock().position = position;
    }

    pub fn set_duration(&self, duration: f64) {
        self.script.lock().duration = duration;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.script.lock().calls.clear();
    }

    pub fn handles_created(&self) -> usize {
        self.script.lock().notifiers.len()
    }

    pub fn live_handles(&self) -> usize {
        self.script.lock().live
    }

    pub fn max_live_handles(&self) -> usize {
        self.script.lock().max_live
    }

    /// Push a notification as if handle `index` raised it.
    pub fn notify(&self, index: usize, notification: MediaNotification) {
        let notifier = self.script.lock().notifiers[index].clone();
        notifier.notify(notification);
    }

    pub fn complete(&self, index: usize) {
        self.notify(index, MediaNotification::Completed);
    }

    pub fn fail(&self, index: usize, error: MediaError) {
        self.notify(index, MediaNotification::Error(error));
    }

    pub fn config(&self) -> core_runtime::config::SessionConfigBuilder {
        SessionConfig::builder().engine(Arc::new(self.clone()))
    }

    pub fn session(&self) -> MediaSession {
        let config = self.config().build().expect("valid config");
        MediaSession::start(config).expect("engine available")
    }
}

#[async_trait]
impl MediaEngine for ScriptedEngine {
    fn is_available(&self) -> bool {
        self.available
    }

    fn acknowledges_release(&self) -> bool {
        self.acknowledges
    }

    async fn create(&self, url: &str, notifier: MediaNotifier) -> BridgeResult<Box<dyn MediaHandle>> {
        let mut script = self.script.lock();
        script.calls.push(Call::Create(url.to_string()));
        if script.fail_create {
            return Err(BridgeError::InvalidSource(url.to_string()));
        }

        let index = script.notifiers.len();
        script.notifiers.push(notifier.clone());
        script.started.push(false);
        script.live += 1;
        script.max_live = script.max_live.max(script.live);

        Ok(Box::new(ScriptedHandle {
            index,
            notifier,
            script: Arc::clone(&self.script),
            acknowledges: self.acknowledges,
        }))
    }
}

struct ScriptedHandle {
    index: usize,
    notifier: MediaNotifier,
    script: Arc<Mutex<Script>>,
    acknowledges: bool,
}

impl ScriptedHandle {
    fn record(&self, call: Call) -> bool {
        let mut script = self.script.lock();
        script.calls.push(call);
        !script.silent
    }
}

#[async_trait]
impl MediaHandle for ScriptedHandle {
    async fn play(&self) -> BridgeResult<()> {
        let announce = self.record(Call::Play(self.index));
        let first = {
            let mut script = self.script.lock();
            !std::mem::replace(&mut script.started[self.index], true)
        };
        if announce {
            if first {
                self.notifier.status(MediaStatus::Starting);
            }
            self.notifier.status(MediaStatus::Running);
        }
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        if self.record(Call::Pause(self.index)) {
            self.notifier.status(MediaStatus::Paused);
        }
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        let announce = self.record(Call::Stop(self.index));
        if self.script.lock().fail_stop {
            return Err(BridgeError::OperationFailed("stop rejected".to_string()));
        }
        if announce {
            self.notifier.status(MediaStatus::Stopped);
        }
        Ok(())
    }

    async fn seek_to(&self, position: Duration) -> BridgeResult<()> {
        self.record(Call::Seek(self.index, position));
        let mut script = self.script.lock();
        if script.fail_seek {
            return Err(BridgeError::OperationFailed("seek rejected".to_string()));
        }
        script.position = position.as_secs_f64();
        Ok(())
    }

    async fn current_position(&self) -> BridgeResult<f64> {
        Ok(self.script.lock().position)
    }

    async fn duration(&self) -> f64 {
        self.script.lock().duration
    }

    async fn release(&self) -> BridgeResult<()> {
        self.record(Call::Release(self.index));
        {
            let mut script = self.script.lock();
            script.live = script.live.saturating_sub(1);
        }
        if self.acknowledges {
            self.notifier.released();
        }
        Ok(())
    }
}

/// Hook calls recorded as short strings, in order.
#[derive(Clone, Default)]
pub struct HookLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl HookLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hooks(&self) -> TrackHooks {
        let success = self.clone();
        let error = self.clone();
        let status = self.clone();
        let progress = self.clone();
        TrackHooks::new()
            .on_success(move || success.push("success".to_string()))
            .on_error(move |err| error.push(format!("error:{}", err.code.code())))
            .on_status_change(move |s| status.push(format!("status:{}", s.code())))
            .on_progress(move |p, d| progress.push(format!("progress:{p}/{d}")))
    }

    fn push(&self, entry: String) {
        self.entries.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }
}

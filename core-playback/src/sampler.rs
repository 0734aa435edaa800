//! Periodic progress sampling for the active handle.

use std::time::Duration;

use bridge_traits::media::MediaHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

use crate::track::TrackState;

/// Single repeating timer owned by the session task.
///
/// At most one ticker exists; `start` while active is a no-op.
pub(crate) struct ProgressSampler {
    period: Duration,
    ticker: Option<Interval>,
}

impl ProgressSampler {
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            period,
            ticker: None,
        }
    }

    /// Arm the ticker. The first tick fires one period from now.
    pub(crate) fn start(&mut self) -> bool {
        if self.ticker.is_some() {
            return false;
        }
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
        true
    }

    pub(crate) fn stop(&mut self) -> bool {
        self.ticker.take().is_some()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.ticker.is_some()
    }

    /// Resolves on the next tick; never resolves while stopped.
    pub(crate) async fn tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// Values read from the handle on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct ProgressSample {
    /// Present only when the duration was still unknown and got queried.
    pub(crate) duration: Option<f64>,
    /// Absent when the engine reported no usable position.
    pub(crate) position: Option<f64>,
}

/// Query duration (only while unknown) and position from `handle`.
///
/// Position errors and negative positions yield no update; they are logged
/// and never reach the track's error hook.
pub(crate) async fn sample(handle: &dyn MediaHandle, state: &TrackState) -> ProgressSample {
    let duration = if state.duration_known() {
        None
    } else {
        Some(handle.duration().await)
    };

    let position = match handle.current_position().await {
        Ok(position) if position >= 0.0 => Some(position),
        Ok(_) => None,
        Err(err) => {
            debug!(error = %err, "Position query failed");
            None
        }
    };

    ProgressSample { duration, position }
}

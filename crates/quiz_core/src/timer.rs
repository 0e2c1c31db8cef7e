//! Countdown timer measured against tokio's monotonic clock.
//!
//! The timer never touches session state. It publishes the remaining time on a
//! watch channel and reports ticks and the single expiry of each run to its
//! owner over an mpsc channel. Every `start` opens a new run; events carry the
//! run they belong to so the owner can drop anything queued by a run that was
//! stopped or paused in the meantime.

use std::{ops::ControlFlow, sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    time::Instant,
};
use tracing::debug;

use crate::{duration_ms, schedule::RepeatingTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { run: RunId, remaining: Duration },
    Expired { run: RunId },
}

struct ActiveRun {
    id: RunId,
    started_at: Instant,
    duration: Duration,
    sampler: RepeatingTask,
}

impl ActiveRun {
    fn remaining_at(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(now.saturating_duration_since(self.started_at))
    }
}

struct FrozenRun {
    remaining: Duration,
    paused_at: Instant,
}

pub struct CountdownTimer {
    tick_interval: Duration,
    events: mpsc::UnboundedSender<TimerEvent>,
    remaining: Arc<watch::Sender<Duration>>,
    active: Option<ActiveRun>,
    frozen: Option<FrozenRun>,
    next_run: u64,
}

impl CountdownTimer {
    pub fn new(tick_interval: Duration, events: mpsc::UnboundedSender<TimerEvent>) -> Self {
        let (remaining, _) = watch::channel(Duration::ZERO);
        Self {
            tick_interval,
            events,
            remaining: Arc::new(remaining),
            active: None,
            frozen: None,
            next_run: 0,
        }
    }

    pub fn channel(tick_interval: Duration) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tick_interval, tx), rx)
    }

    /// Starts a fresh run, replacing any run or pause in progress.
    pub fn start(&mut self, duration: Duration) -> RunId {
        self.stop();
        self.next_run += 1;
        let run = RunId(self.next_run);
        let started_at = Instant::now();
        self.remaining.send_replace(duration);

        let remaining = Arc::clone(&self.remaining);
        let events = self.events.clone();
        let sampler = RepeatingTask::spawn(self.tick_interval, move || {
            let left = duration.saturating_sub(started_at.elapsed());
            remaining.send_replace(left);
            if left.is_zero() {
                let _ = events.send(TimerEvent::Expired { run });
                return ControlFlow::Break(());
            }
            match events.send(TimerEvent::Tick {
                run,
                remaining: left,
            }) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            }
        });

        debug!(run = run.0, duration_ms = duration_ms(duration), "timer: started");
        self.active = Some(ActiveRun {
            id: run,
            started_at,
            duration,
            sampler,
        });
        run
    }

    /// Freezes the remaining time and halts sampling. Returns `None` when there
    /// is no live run to pause, including a run that already hit zero and is
    /// about to report expiry.
    pub fn pause(&mut self) -> Option<Duration> {
        let now = Instant::now();
        let left = self.active.as_ref()?.remaining_at(now);
        if left.is_zero() {
            return None;
        }

        let active = self.active.take()?;
        active.sampler.cancel();
        self.remaining.send_replace(left);
        self.frozen = Some(FrozenRun {
            remaining: left,
            paused_at: now,
        });
        debug!(run = active.id.0, remaining_ms = duration_ms(left), "timer: paused");
        Some(left)
    }

    /// Restarts from the frozen remainder as a brand new run.
    pub fn resume(&mut self) -> Option<RunId> {
        let frozen = self.frozen.take()?;
        if frozen.remaining.is_zero() {
            return None;
        }
        debug!(
            paused_for_ms = duration_ms(frozen.paused_at.elapsed()),
            "timer: resuming"
        );
        Some(self.start(frozen.remaining))
    }

    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.sampler.cancel();
            debug!(run = active.id.0, "timer: stopped");
        }
        self.frozen = None;
    }

    pub fn current_remaining(&self) -> Duration {
        *self.remaining.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Duration> {
        self.remaining.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.sampler.is_finished())
    }

    pub fn is_paused(&self) -> bool {
        self.frozen.is_some()
    }

    /// Whether an event from `run` still belongs to the live run.
    pub fn accepts(&self, run: RunId) -> bool {
        self.active.as_ref().is_some_and(|active| active.id == run)
    }
}

#[cfg(test)]
#[path = "tests/timer_tests.rs"]
mod tests;

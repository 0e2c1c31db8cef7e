//! Cancellable background tasks used by the countdown timer and the
//! controller's delayed auto-advance.

use std::{future::Future, ops::ControlFlow, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Runs a callback at a fixed period until it breaks or is cancelled.
pub struct RepeatingTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    /// The first tick fires immediately.
    pub fn spawn<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        if tick().is_break() {
                            break;
                        }
                    }
                }
            }
        });
        Self { token, handle }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Runs a future once after a delay unless cancelled first.
pub struct DelayedTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl DelayedTask {
    pub fn spawn<F>(delay: Duration, work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => work.await,
            }
        });
        Self { token, handle }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for DelayedTask {
    fn drop(&mut self) {
        // Only signals; the task may be the one dropping us.
        self.token.cancel();
    }
}

#[cfg(test)]
#[path = "tests/schedule_tests.rs"]
mod tests;

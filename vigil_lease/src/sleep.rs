//! Timed waits and cancellation
//!
//! The runner suspends only through [`Sleep`]; injecting a test
//! implementation bound to a test clock makes every pacing decision
//! deterministic.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Interrupted;

/// A scoped timed wait
#[async_trait]
pub trait Sleep: Send + Sync + 'static {
    /// Suspends the calling task for at least `duration`
    ///
    /// Returns [`Interrupted`] when the wait cannot complete because the
    /// sleeper itself is being torn down.
    async fn sleep(&self, duration: Duration) -> Result<(), Interrupted>;
}

/// Wall-clock sleeper backed by the tokio timer
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleep;

#[async_trait]
impl Sleep for TokioSleep {
    async fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        tokio::time::sleep(duration).await;
        Ok(())
    }
}

/// A sleeper paired with the runner's cancellation token
///
/// Every suspension point in the runner goes through [`wait`][Self::wait],
/// so cancellation is observed no later than the next sleep.
pub(crate) struct Waiter<S> {
    sleep: S,
    cancel: CancellationToken,
}

impl<S: Sleep> Waiter<S> {
    pub(crate) fn new(sleep: S, cancel: CancellationToken) -> Self {
        Self { sleep, cancel }
    }

    pub(crate) async fn wait(&self, duration: Duration) -> Result<(), Interrupted> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(Interrupted),
            outcome = self.sleep.sleep(duration) => outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wall_clock_sleep_completes() {
        let outcome = TokioSleep.sleep(Duration::from_millis(5)).await;
        assert_eq!(outcome, Ok(()));
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_wait() {
        let cancel = CancellationToken::new();
        let waiter = Waiter::new(TokioSleep, cancel.clone());

        cancel.cancel();
        let outcome = waiter.wait(Duration::from_secs(3600)).await;
        assert_eq!(outcome, Err(Interrupted));
    }
}

//! Backoff between failed acquisition attempts
//!
//! Login failures are retried forever; each retry waits twice as long as
//! the previous one, up to a cap, with a little jitter so that a fleet of
//! instances recovering from the same outage does not stampede the
//! backend in lockstep.

use std::time::Duration;

use rand::Rng;

const INITIAL_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(8 * 60);
const JITTER_FACTOR: f64 = 0.10;

/// Stateful backoff for the acquisition loop
///
/// A fresh instance is built for every acquisition phase, so the ladder
/// always restarts at one second after a successful login.
#[derive(Debug)]
pub(crate) struct LoginBackoff {
    next_nominal: Duration,
}

impl LoginBackoff {
    pub(crate) fn new() -> Self {
        Self {
            next_nominal: INITIAL_DELAY,
        }
    }

    /// Returns the wait for this failure and advances the ladder
    ///
    /// The nominal sequence is 1s, 2s, 4s, … capped at eight minutes;
    /// the returned wait is the nominal stretched by 0–10%.
    pub(crate) fn next_delay<R: Rng>(&mut self, rng: &mut R) -> Duration {
        let nominal = self.next_nominal;
        self.next_nominal = (nominal * 2).min(MAX_DELAY);
        nominal + nominal.mul_f64(JITTER_FACTOR * rng.gen::<f64>())
    }
}

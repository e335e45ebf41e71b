//! Renewal pacing
//!
//! A lease is renewed on an adaptive cadence: long sleeps while plenty of
//! validity remains, shorter and shorter ones as the internal renewal
//! deadline approaches. The deadline sits a randomized grace period
//! before the actual expiration, so the manager always leaves itself
//! room to fall back to a fresh acquisition while the old credential is
//! still honored.

use std::time::Duration;

use rand::Rng;
use vigil_clock::UnixMillis;

/// Fraction of the observed TTL reserved as the grace window
const GRACE_FACTOR: f64 = 0.10;

/// Fraction of the remaining time to the deadline slept between attempts
const RENEW_WAIT_PROPORTION: f64 = 2.0 / 3.0;

/// The pacing computed from one observation of a lease's TTL
///
/// Rebuilt on every successful renewal: lease periods change across
/// renewals (maximum TTLs, differing initial-vs-renewal grants, policy
/// changes on the backend), and the grace window must track the TTL the
/// backend most recently granted.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RenewalSchedule {
    deadline: UnixMillis,
    grace: Duration,
}

impl RenewalSchedule {
    /// Computes the schedule for a lease expiring at `expiration`, as
    /// observed at `now`
    pub(crate) fn new<R: Rng>(now: UnixMillis, expiration: UnixMillis, rng: &mut R) -> Self {
        let grace = grace_period(expiration - now, rng);
        Self {
            deadline: expiration - grace,
            grace,
        }
    }

    /// The latest instant at which a renewal will still be attempted
    pub(crate) fn deadline(&self) -> UnixMillis {
        self.deadline
    }

    /// The randomized grace window for this observation
    pub(crate) fn grace(&self) -> Duration {
        self.grace
    }

    /// How long to sleep before the next renewal attempt
    ///
    /// The sleep is two thirds of the remaining time to the deadline plus
    /// a quarter of the grace period; the first term shrinks
    /// geometrically as the deadline nears, the second is a floor that
    /// keeps the loop from spinning. Returns `None` when the planned wake
    /// would land at or past the deadline, which is the signal to leave
    /// the renew loop and acquire a fresh lease.
    pub(crate) fn next_sleep(&self, now: UnixMillis) -> Option<Duration> {
        let remaining = self.deadline - now;
        let sleep = remaining.mul_f64(RENEW_WAIT_PROPORTION) + self.grace / 4;

        if now + sleep >= self.deadline {
            None
        } else {
            Some(sleep)
        }
    }
}

/// Computes a randomized grace period from an observed TTL
///
/// Uniformly distributed in `[0.10·ttl, 0.20·ttl)`; zero when the TTL is
/// zero, so an already-expired lease falls straight through to
/// re-acquisition.
fn grace_period<R: Rng>(ttl: Duration, rng: &mut R) -> Duration {
    if ttl.is_zero() {
        return Duration::ZERO;
    }

    ttl.mul_f64(GRACE_FACTOR * (1.0 + rng.gen::<f64>()))
}

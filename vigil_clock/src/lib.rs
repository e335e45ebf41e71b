//! Clocks and time values for lease arithmetic
//!
//! Everything in the lease manager that asks "what time is it" does so
//! through the [`Clock`] trait, so that tests can drive the passage of
//! time explicitly instead of waiting on the wall clock.

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_must_use
)]
#![forbid(unsafe_code)]

use std::{
    fmt, ops,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, SystemTime},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An instant in Unix time with millisecond resolution
///
/// Milliseconds elapsed since the beginning of the Unix epoch on
/// 1970/01/01 at 00:00:00 UTC. Millisecond resolution is enough for
/// renewal pacing, which deals in fractions of multi-second grace
/// periods, while staying a single machine word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct UnixMillis(pub u64);

impl From<SystemTime> for UnixMillis {
    #[inline]
    fn from(t: SystemTime) -> Self {
        let millis = t
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("times before Unix epoch are not expected")
            .as_millis();

        UnixMillis(millis as u64)
    }
}

impl From<UnixMillis> for SystemTime {
    #[inline]
    fn from(t: UnixMillis) -> Self {
        SystemTime::UNIX_EPOCH + Duration::from_millis(t.0)
    }
}

impl fmt::Display for UnixMillis {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl ops::Add<Duration> for UnixMillis {
    type Output = Self;

    #[inline]
    fn add(self, other: Duration) -> Self::Output {
        Self(self.0.saturating_add(other.as_millis() as u64))
    }
}

impl ops::AddAssign<Duration> for UnixMillis {
    #[inline]
    fn add_assign(&mut self, other: Duration) {
        *self = *self + other
    }
}

/// Subtracting a duration that reaches past the epoch saturates to the
/// epoch itself.
impl ops::Sub<Duration> for UnixMillis {
    type Output = Self;

    #[inline]
    fn sub(self, other: Duration) -> Self::Output {
        Self(self.0.saturating_sub(other.as_millis() as u64))
    }
}

impl ops::SubAssign<Duration> for UnixMillis {
    #[inline]
    fn sub_assign(&mut self, other: Duration) {
        *self = *self - other
    }
}

/// The elapsed time between two instants, saturating to zero when the
/// subtrahend is the later of the two.
impl ops::Sub for UnixMillis {
    type Output = Duration;

    #[inline]
    fn sub(self, other: Self) -> Self::Output {
        Duration::from_millis(self.0.saturating_sub(other.0))
    }
}

impl ops::Add<DurationSecs> for UnixMillis {
    type Output = Self;

    #[inline]
    fn add(self, other: DurationSecs) -> Self::Output {
        Self(self.0.saturating_add(other.0.saturating_mul(1000)))
    }
}

#[cfg(feature = "serde")]
impl Serialize for UnixMillis {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for UnixMillis {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Self(millis))
    }
}

/// Duration denominated in whole seconds
///
/// Lease durations are granted by the backend in whole seconds; this
/// type keeps that unit explicit rather than widening every value to a
/// nanosecond-precision duration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct DurationSecs(pub u64);

impl From<Duration> for DurationSecs {
    #[inline]
    fn from(d: Duration) -> Self {
        Self(d.as_secs())
    }
}

impl From<DurationSecs> for Duration {
    #[inline]
    fn from(d: DurationSecs) -> Self {
        Duration::from_secs(d.0)
    }
}

impl fmt::Display for DurationSecs {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(feature = "serde")]
impl Serialize for DurationSecs {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for DurationSecs {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Self(secs))
    }
}

/// Represents a clock, which can tell the current time
pub trait Clock: fmt::Debug {
    /// Gets the current time according to this clock
    fn now(&self) -> UnixMillis;
}

/// The system clock as provided by `std::time::SystemTime`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct System;

impl Clock for System {
    #[inline]
    fn now(&self) -> UnixMillis {
        UnixMillis::from(SystemTime::now())
    }
}

/// A test clock which maintains the current time as internal state
///
/// Clones share the same underlying time, so one handle can be given to
/// the code under test while the test itself keeps another to advance.
#[derive(Clone, Debug, Default)]
pub struct TestClock(Arc<AtomicU64>);

impl Clock for TestClock {
    #[inline]
    fn now(&self) -> UnixMillis {
        UnixMillis(self.0.load(Ordering::Acquire))
    }
}

impl TestClock {
    /// Creates a new test clock with the specified time
    #[inline]
    pub fn new(time: UnixMillis) -> Self {
        Self(Arc::new(AtomicU64::new(time.0)))
    }

    /// Updates the clock's current time to `val`
    pub fn set(&self, val: UnixMillis) {
        self.0.store(val.0, Ordering::Release);
    }

    /// Moves the clock's current time forward by `step`
    pub fn advance(&self, step: Duration) {
        self.0
            .fetch_add(step.as_millis() as u64, Ordering::AcqRel);
    }
}

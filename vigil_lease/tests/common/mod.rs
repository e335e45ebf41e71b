//! Shared simulation harness for the lifecycle tests
//!
//! Time is driven entirely by the test: the clock only moves when a test
//! calls [`SimClock::advance`], and the sleeper parks tasks on latches
//! that the clock releases as their deadlines pass. Combined with a
//! seeded random source in the lifecycle itself, every scenario here is
//! reproducible run to run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::oneshot;
use vigil_clock::{Clock, DurationSecs, TestClock, UnixMillis};
use vigil_lease::{AuthResult, BackendError, Interrupted, Login, Renew, Sleep};

/// A test clock that releases parked sleepers as it advances
#[derive(Clone, Debug, Default)]
pub struct SimClock {
    inner: Arc<SimClockInner>,
}

#[derive(Debug, Default)]
struct SimClockInner {
    clock: TestClock,
    sleepers: Mutex<Vec<(UnixMillis, oneshot::Sender<()>)>>,
    requested: Mutex<Vec<Duration>>,
}

impl Clock for SimClock {
    fn now(&self) -> UnixMillis {
        self.inner.clock.now()
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sleeper bound to this clock
    pub fn sleeper(&self) -> SimSleep {
        SimSleep {
            clock: self.clone(),
        }
    }

    /// Moves time forward and releases every sleeper whose deadline passed
    pub fn advance(&self, step: Duration) {
        self.inner.clock.advance(step);
        self.release_due();
    }

    /// Every duration handed to the sleeper so far, in request order
    pub fn requested_sleeps(&self) -> Vec<Duration> {
        self.inner.requested.lock().unwrap().clone()
    }

    fn release_due(&self) {
        let now = self.now();
        let mut sleepers = self.inner.sleepers.lock().unwrap();
        let mut pending = Vec::new();
        for (deadline, release) in sleepers.drain(..) {
            if deadline <= now {
                let _ = release.send(());
            } else {
                pending.push((deadline, release));
            }
        }
        *sleepers = pending;
    }
}

/// A sleeper that parks on a latch until the clock reaches its deadline
#[derive(Clone, Debug)]
pub struct SimSleep {
    clock: SimClock,
}

#[async_trait]
impl Sleep for SimSleep {
    async fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let (release, released) = oneshot::channel();
        {
            let deadline = self.clock.now() + duration;
            self.clock.inner.requested.lock().unwrap().push(duration);
            self.clock
                .inner
                .sleepers
                .lock()
                .unwrap()
                .push((deadline, release));
        }
        // a zero-length sleep must not wait for the next tick
        self.clock.release_due();
        released.await.map_err(|_| Interrupted)
    }
}

/// Tunables for the simulated backend
#[derive(Clone, Copy, Debug)]
pub struct BackendConfig {
    pub login_ttl: Duration,
    pub renew_extension: Duration,
    pub renewable: bool,
    pub login_failure_rate: f64,
    pub renew_failure_rate: f64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            login_ttl: Duration::from_secs(3_600),
            renew_extension: Duration::from_secs(20 * 60),
            renewable: true,
            login_failure_rate: 0.0,
            renew_failure_rate: 0.0,
        }
    }
}

#[derive(Debug)]
struct IssuedLease {
    expires_at: UnixMillis,
}

#[derive(Debug, Default)]
struct BackendState {
    leases: HashMap<String, IssuedLease>,
    issued: u64,
    logins: u64,
    renewals: u64,
}

/// An in-memory credential backend issuing leases against the sim clock
///
/// Leases expire as the clock advances, renewals extend them, and both
/// operations can inject seeded random failures. Clones share state, so
/// a test keeps one handle for assertions while the lifecycle owns
/// others as its Login/Renew collaborators.
#[derive(Clone, Debug)]
pub struct FakeBackend {
    inner: Arc<BackendInner>,
}

#[derive(Debug)]
struct BackendInner {
    clock: SimClock,
    config: BackendConfig,
    scripted_login_failures: AtomicU64,
    rng: Mutex<StdRng>,
    state: Mutex<BackendState>,
}

impl FakeBackend {
    pub fn new(clock: SimClock, seed: u64, config: BackendConfig) -> Self {
        Self {
            inner: Arc::new(BackendInner {
                clock,
                config,
                scripted_login_failures: AtomicU64::new(0),
                rng: Mutex::new(StdRng::seed_from_u64(seed)),
                state: Mutex::new(BackendState::default()),
            }),
        }
    }

    /// Makes the next `count` logins fail deterministically
    pub fn fail_next_logins(&self, count: u64) {
        self.inner
            .scripted_login_failures
            .store(count, Ordering::SeqCst);
    }

    /// Whether the backend would still honor this lease right now
    pub fn is_valid(&self, id: &str) -> bool {
        let now = self.inner.clock.now();
        self.inner
            .state
            .lock()
            .unwrap()
            .leases
            .get(id)
            .map(|lease| lease.expires_at > now)
            .unwrap_or(false)
    }

    /// How many distinct leases have been issued
    pub fn tokens_created(&self) -> u64 {
        self.inner.state.lock().unwrap().issued
    }

    /// How many logins have succeeded
    pub fn login_count(&self) -> u64 {
        self.inner.state.lock().unwrap().logins
    }

    /// How many renewals have succeeded
    pub fn renewal_count(&self) -> u64 {
        self.inner.state.lock().unwrap().renewals
    }

    fn maybe_fail(&self, rate: f64, op: &str) -> Result<(), BackendError> {
        if rate > 0.0 && self.inner.rng.lock().unwrap().gen::<f64>() < rate {
            return Err(format!("simulated backend availability error during {op}").into());
        }
        Ok(())
    }
}

#[async_trait]
impl Login for FakeBackend {
    async fn login(&self) -> Result<AuthResult, BackendError> {
        if self.inner.scripted_login_failures.load(Ordering::SeqCst) > 0 {
            self.inner
                .scripted_login_failures
                .fetch_sub(1, Ordering::SeqCst);
            return Err("scripted login outage".into());
        }
        self.maybe_fail(self.inner.config.login_failure_rate, "login")?;

        let now = self.inner.clock.now();
        let mut state = self.inner.state.lock().unwrap();
        state.issued += 1;
        state.logins += 1;
        let id = format!("lease-{:04}", state.issued);
        state.leases.insert(
            id.clone(),
            IssuedLease {
                expires_at: now + self.inner.config.login_ttl,
            },
        );

        Ok(AuthResult::new(
            id,
            DurationSecs(self.inner.config.login_ttl.as_secs()),
            self.inner.config.renewable,
        )
        .with_policies(["default".to_owned()]))
    }
}

#[async_trait]
impl Renew for FakeBackend {
    async fn renew(&self, token: &AuthResult) -> Result<AuthResult, BackendError> {
        self.maybe_fail(self.inner.config.renew_failure_rate, "renew")?;

        let now = self.inner.clock.now();
        let mut state = self.inner.state.lock().unwrap();
        let id = token.client_token().as_str();
        let lease = match state.leases.get_mut(id) {
            Some(lease) => lease,
            None => return Err(format!("lease {id} does not exist and cannot be renewed").into()),
        };
        if lease.expires_at < now {
            return Err(format!(
                "lease {id} expired at {} and cannot be renewed (now {now})",
                lease.expires_at
            )
            .into());
        }

        lease.expires_at = lease.expires_at + self.inner.config.renew_extension;
        let remaining = lease.expires_at - now;
        state.renewals += 1;

        Ok(AuthResult::new(
            id,
            DurationSecs::from(remaining),
            self.inner.config.renewable,
        ))
    }
}

/// Advances the clock one step and lets the runner catch up
pub async fn tick(clock: &SimClock, step: Duration) {
    clock.advance(step);
    settle().await;
}

/// Yields enough times for the runner task to reach its next suspension
pub async fn settle() {
    for _ in 0..3 {
        tokio::task::yield_now().await;
    }
}

/// Installs a compact tracing subscriber honoring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

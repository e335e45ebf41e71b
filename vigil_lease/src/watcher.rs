//! Spawning and observing the background lifecycle

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use vigil_clock::{Clock, System};

use crate::cell::{Slot, TokenCell, TokenReader};
use crate::error::{LifecycleQuit, ReadyTimeoutError, UsageError};
use crate::lifecycle::Runner;
use crate::sleep::{Sleep, TokioSleep, Waiter};
use crate::source::{Login, Renew};
use crate::token::{AuthResult, TokenWithExpiration};

/// Configures and spawns a lease lifecycle
///
/// `login` and `renew` are required; everything else has production
/// defaults. The clock, sleeper, and random source can be replaced to
/// make the lifecycle fully deterministic under test.
pub struct LifecycleBuilder<C = System, S = TokioSleep, R = StdRng> {
    login: Option<Arc<dyn Login>>,
    renew: Option<Arc<dyn Renew>>,
    initial_token: Option<AuthResult>,
    clock: C,
    sleep: S,
    rng: R,
}

impl LifecycleBuilder {
    /// Creates a builder with the wall clock, the tokio timer, and an
    /// entropy-seeded random source
    pub fn new() -> Self {
        Self {
            login: None,
            renew: None,
            initial_token: None,
            clock: System,
            sleep: TokioSleep,
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for LifecycleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, S, R> LifecycleBuilder<C, S, R> {
    /// Sets the Login collaborator (required)
    pub fn login(mut self, login: impl Login) -> Self {
        self.login = Some(Arc::new(login));
        self
    }

    /// Sets the Renew collaborator (required)
    pub fn renew(mut self, renew: impl Renew) -> Self {
        self.renew = Some(Arc::new(renew));
        self
    }

    /// Supplies a lease the caller already obtained
    ///
    /// The runner starts directly in its renew loop instead of logging
    /// in first. Performing that first login synchronously is how a
    /// caller surfaces credential problems at startup rather than as
    /// background log noise.
    pub fn initial_token(mut self, token: AuthResult) -> Self {
        self.initial_token = Some(token);
        self
    }

    /// Sets a custom clock to be used
    ///
    /// Useful for testing purposes
    pub fn with_clock<D>(self, clock: D) -> LifecycleBuilder<D, S, R> {
        LifecycleBuilder {
            login: self.login,
            renew: self.renew,
            initial_token: self.initial_token,
            clock,
            sleep: self.sleep,
            rng: self.rng,
        }
    }

    /// Sets a custom sleeper to be used
    ///
    /// Useful for testing purposes
    pub fn with_sleep<T>(self, sleep: T) -> LifecycleBuilder<C, T, R> {
        LifecycleBuilder {
            login: self.login,
            renew: self.renew,
            initial_token: self.initial_token,
            clock: self.clock,
            sleep,
            rng: self.rng,
        }
    }

    /// Sets a custom random source to be used
    ///
    /// Useful for making grace periods and backoff jitter reproducible
    pub fn with_rng<Q>(self, rng: Q) -> LifecycleBuilder<C, S, Q> {
        LifecycleBuilder {
            login: self.login,
            renew: self.renew,
            initial_token: self.initial_token,
            clock: self.clock,
            sleep: self.sleep,
            rng,
        }
    }
}

impl<C, S, R> LifecycleBuilder<C, S, R>
where
    C: Clock + Send + 'static,
    S: Sleep,
    R: Rng + Send + 'static,
{
    /// Validates the configuration and spawns the runner
    ///
    /// The runner is a detached background task; like a daemon thread it
    /// never keeps the process alive on its own. Must be called from
    /// within a tokio runtime.
    pub fn spawn(self) -> Result<LifecycleHandle, UsageError> {
        let login = self.login.ok_or(UsageError::MissingLogin)?;
        let renew = self.renew.ok_or(UsageError::MissingRenew)?;

        let (cell, rx) = TokenCell::new();
        if let Some(auth) = self.initial_token {
            // rx is still alive here, so the store cannot fail
            cell.store(Arc::new(TokenWithExpiration::new(self.clock.now(), auth)));
        }

        let cancel = CancellationToken::new();
        let waiter = Waiter::new(self.sleep, cancel.clone());
        let runner = Runner::new(login, renew, cell, self.clock, waiter, self.rng);

        let join = tokio::spawn(runner.run());
        tokio::spawn(async move {
            if let Err(error) = join.await {
                if error.is_panic() {
                    tracing::error!("lease lifecycle panicked!");
                }
            }
        });

        Ok(LifecycleHandle { rx, cancel })
    }
}

impl<C: fmt::Debug, S: fmt::Debug, R> fmt::Debug for LifecycleBuilder<C, S, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LifecycleBuilder")
            .field("login", &self.login.as_ref().map(|_| ".."))
            .field("renew", &self.renew.as_ref().map(|_| ".."))
            .field("initial_token", &self.initial_token)
            .field("clock", &self.clock)
            .field("sleep", &self.sleep)
            .finish()
    }
}

/// A handle on a spawned lifecycle
///
/// Cheap to clone; every clone observes the same published token and
/// shares the same cancellation.
#[derive(Clone, Debug)]
pub struct LifecycleHandle {
    rx: watch::Receiver<Slot>,
    cancel: CancellationToken,
}

impl LifecycleHandle {
    /// Creates a builder for a new lifecycle
    pub fn builder() -> LifecycleBuilder {
        LifecycleBuilder::new()
    }

    /// Gets the currently published token
    ///
    /// `None` until the first login has completed; callers that need a
    /// guarantee should go through [`ready`][Self::ready] instead.
    pub fn current(&self) -> Option<Arc<TokenWithExpiration>> {
        self.rx.borrow().clone()
    }

    /// Waits until a first token has been published
    ///
    /// The returned reader can never observe an empty slot. Fails only
    /// if the runner terminated before managing a single login.
    pub async fn ready(&self) -> Result<TokenReader, LifecycleQuit> {
        let mut rx = self.rx.clone();
        if rx.wait_for(|slot| slot.is_some()).await.is_err() {
            return Err(LifecycleQuit);
        }
        Ok(TokenReader::new(rx))
    }

    /// Waits until a first token has been published, giving up after
    /// `timeout`
    pub async fn ready_timeout(&self, timeout: Duration) -> Result<TokenReader, ReadyTimeoutError> {
        match tokio::time::timeout(timeout, self.ready()).await {
            Ok(outcome) => outcome.map_err(ReadyTimeoutError::from),
            Err(_) => Err(ReadyTimeoutError::Elapsed),
        }
    }

    /// Signals the runner to stop
    ///
    /// Idempotent. The runner exits at its next suspension point; the
    /// last published token remains readable afterwards.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the runner has fully terminated
    pub fn is_terminated(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}

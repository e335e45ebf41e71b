//! The lease lifecycle state machine
//!
//! The runner loops forever between two phases: a renew loop that keeps
//! the current lease alive inside its grace window, and a stubborn
//! acquisition loop that obtains a fresh lease (under exponential
//! backoff) whenever renewal can no longer be scheduled safely. The only
//! way out is cancellation, or every observer of the published token
//! going away.

use std::error;
use std::sync::Arc;

use rand::Rng;
use vigil_clock::Clock;

use crate::backoff::LoginBackoff;
use crate::cell::TokenCell;
use crate::error::Interrupted;
use crate::schedule::RenewalSchedule;
use crate::sleep::{Sleep, Waiter};
use crate::source::{Login, Renew};
use crate::token::TokenWithExpiration;

/// Why the runner stopped
pub(crate) enum Stop {
    /// Cancellation was observed at a suspension point
    Cancelled,
    /// Every handle and reader was dropped; nobody can see new tokens
    Unobserved,
}

impl From<Interrupted> for Stop {
    fn from(_: Interrupted) -> Self {
        Stop::Cancelled
    }
}

pub(crate) struct Runner<C, S, R> {
    login: Arc<dyn Login>,
    renew: Arc<dyn Renew>,
    cell: TokenCell,
    clock: C,
    waiter: Waiter<S>,
    rng: R,
}

impl<C, S, R> Runner<C, S, R>
where
    C: Clock + Send + 'static,
    S: Sleep,
    R: Rng + Send + 'static,
{
    pub(crate) fn new(
        login: Arc<dyn Login>,
        renew: Arc<dyn Renew>,
        cell: TokenCell,
        clock: C,
        waiter: Waiter<S>,
        rng: R,
    ) -> Self {
        Self {
            login,
            renew,
            cell,
            clock,
            waiter,
            rng,
        }
    }

    /// Drives the lifecycle until cancellation
    pub(crate) async fn run(mut self) {
        match self.drive().await {
            Stop::Cancelled => tracing::debug!("lease lifecycle cancelled"),
            Stop::Unobserved => {
                tracing::info!("no one is listening for leases anymore, halting lifecycle")
            }
        }
    }

    async fn drive(&mut self) -> Stop {
        loop {
            // the cell is empty on the first pass unless the caller
            // performed its own login up front
            let current = match self.cell.load() {
                Some(token) => token,
                None => {
                    tracing::debug!("acquiring first lease");
                    match self.acquire_stubbornly().await {
                        Ok(token) => token,
                        Err(stop) => return stop,
                    }
                }
            };

            if let Err(stop) = self.renew_until_deadline(current).await {
                return stop;
            }

            // renewal stopped because another attempt no longer fits
            // inside the grace window: max-TTL reached, the backend
            // shortened the lease, or renewals kept failing. In every
            // case the safe recovery is a brand-new lease.
            if let Err(stop) = self.acquire_stubbornly().await {
                return stop;
            }
        }
    }

    /// Keeps renewing `current` until the next planned wake would cross
    /// the renewal deadline
    async fn renew_until_deadline(
        &mut self,
        mut current: Arc<TokenWithExpiration>,
    ) -> Result<(), Stop> {
        let now = self.clock.now();
        let mut schedule = RenewalSchedule::new(now, current.expiration(), &mut self.rng);
        tracing::debug!(
            grace_ms = schedule.grace().as_millis() as u64,
            deadline = %schedule.deadline(),
            "entering renew loop"
        );

        loop {
            if current.token().renewable() {
                // sampled before the call so network latency is charged
                // against the lease
                let before_call = self.clock.now();
                match self.renew.renew(current.token()).await {
                    Ok(renewed) => {
                        let token = Arc::new(TokenWithExpiration::new(before_call, renewed));
                        schedule =
                            RenewalSchedule::new(before_call, token.expiration(), &mut self.rng);
                        if !self.cell.store(token.clone()) {
                            return Err(Stop::Unobserved);
                        }
                        tracing::debug!(
                            lease_secs = token.token().lease_duration().0,
                            deadline = %schedule.deadline(),
                            "renewed lease"
                        );
                        current = token;
                    }
                    Err(error) => {
                        // tolerated: keep the current lease and retry on
                        // the existing schedule until the window closes
                        tracing::warn!(
                            error = (&*error as &dyn error::Error),
                            "failed to renew lease, will retry"
                        );
                    }
                }
            }

            let now = self.clock.now();
            match schedule.next_sleep(now) {
                Some(delay) => {
                    tracing::trace!(
                        delay_ms = delay.as_millis() as u64,
                        "waiting before next renewal"
                    );
                    self.waiter.wait(delay).await?;
                }
                None => {
                    tracing::debug!(
                        deadline = %schedule.deadline(),
                        "next wake would cross the renewal deadline, leaving renew loop"
                    );
                    return Ok(());
                }
            }
        }
    }

    /// Logs in for a fresh lease, retrying forever under backoff
    async fn acquire_stubbornly(&mut self) -> Result<Arc<TokenWithExpiration>, Stop> {
        let mut backoff = LoginBackoff::new();

        loop {
            let before_call = self.clock.now();
            match self.login.login().await {
                Ok(auth) => {
                    let token = Arc::new(TokenWithExpiration::new(before_call, auth));
                    if !self.cell.store(token.clone()) {
                        return Err(Stop::Unobserved);
                    }
                    tracing::info!(
                        lease_secs = token.token().lease_duration().0,
                        renewable = token.token().renewable(),
                        "acquired new lease"
                    );
                    return Ok(token);
                }
                Err(error) => {
                    let delay = backoff.next_delay(&mut self.rng);
                    tracing::error!(
                        error = (&*error as &dyn error::Error),
                        delay_ms = delay.as_millis() as u64,
                        "failed to log in for lease, backing off"
                    );
                    self.waiter.wait(delay).await?;
                }
            }
        }
    }
}

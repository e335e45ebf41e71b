//! Background management of short-lived auth leases
//!
//! A client that authenticates its outbound calls with a short-lived
//! bearer credential needs that credential to stay valid without every
//! call site thinking about expiry. This library moves the whole concern
//! into the background: a runner task renews the current lease while it
//! can, falls back to acquiring a brand-new lease (with exponential
//! backoff) when it can't, and publishes whatever is currently valid to
//! any number of concurrent readers.
//!
//! The pacing mirrors the renewal strategy of HashiCorp's lifetime
//! watcher: a randomized grace period of 10–20% of the observed TTL is
//! reserved ahead of expiration, renewals are attempted on a geometric
//! cadence inside that window, and the runner gives up on a lease only
//! when another renewal attempt can no longer be scheduled before the
//! grace window opens. Transient renewal failures never surface to
//! readers; they see the last valid token until a replacement arrives.
//!
//! # Usage
//!
//! Implement [`Login`] and [`Renew`] against your secret-store client,
//! then spawn the lifecycle and wait for readiness:
//!
//! ```no_run
//! use vigil_clock::DurationSecs;
//! use vigil_lease::{AuthResult, BackendError, LifecycleHandle, Login, Renew};
//!
//! # struct Backend;
//! # #[async_trait::async_trait]
//! # impl Login for Backend {
//! #     async fn login(&self) -> Result<AuthResult, BackendError> {
//! #         Ok(AuthResult::new("s.example", DurationSecs(3600), true))
//! #     }
//! # }
//! # #[async_trait::async_trait]
//! # impl Renew for Backend {
//! #     async fn renew(&self, current: &AuthResult) -> Result<AuthResult, BackendError> {
//! #         Ok(AuthResult::new(current.client_token().as_str(), DurationSecs(3600), true))
//! #     }
//! # }
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = LifecycleHandle::builder()
//!     .login(Backend)
//!     .renew(Backend)
//!     .spawn()?;
//!
//! let reader = handle.ready().await?;
//! let lease = reader.latest();
//! tracing::info!(
//!     token = format_args!("{:#?}", lease.token().client_token()),
//!     "first lease"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! Callers that want credential problems surfaced at startup can perform
//! the first login themselves and hand the result to
//! [`LifecycleBuilder::initial_token`]; the runner then starts directly
//! in its renew loop and readiness is immediate.
//!
//! Readers must still be prepared for the backend rejecting a token:
//! during a total outage the published lease eventually outlives its
//! TTL, and the reader sees the stale value until the runner manages to
//! log in again.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod backoff;
mod cell;
mod error;
mod lifecycle;
mod schedule;
mod sleep;
mod source;
mod token;
mod watcher;

pub use cell::TokenReader;
pub use error::{BackendError, Interrupted, LifecycleQuit, ReadyTimeoutError, UsageError};
pub use sleep::{Sleep, TokioSleep};
pub use source::{Login, Renew};
pub use token::{AuthResult, ClientToken, TokenWithExpiration};
pub use watcher::{LifecycleBuilder, LifecycleHandle};

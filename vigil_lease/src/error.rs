//! Error kinds surfaced by the lifecycle

use thiserror::Error;

/// Any failure returned by the credential backend
///
/// Login and Renew collaborators own their transport and protocol
/// concerns; from the lifecycle's perspective every failure is opaque and
/// handled the same way, so the error arrives boxed.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A timed wait was interrupted by cancellation
///
/// This is the only fatal condition the runner recognizes; it unwinds
/// whatever phase was in progress and terminates the background task.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("wait interrupted by cancellation")]
pub struct Interrupted;

/// The lifecycle was misconfigured
///
/// Raised eagerly by [`spawn`][crate::LifecycleBuilder::spawn]; no
/// background task is started when construction fails.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum UsageError {
    /// No Login collaborator was configured
    #[error("a Login collaborator must be configured before spawning")]
    MissingLogin,
    /// No Renew collaborator was configured
    #[error("a Renew collaborator must be configured before spawning")]
    MissingRenew,
}

/// The runner terminated before publishing a first token
///
/// Returned when awaiting readiness on a lifecycle that was cancelled (or
/// otherwise halted) before its first successful login.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("lifecycle terminated before a token was published")]
pub struct LifecycleQuit;

/// A bounded wait for readiness did not produce a token
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum ReadyTimeoutError {
    /// The runner terminated before publishing a first token
    #[error(transparent)]
    Quit(#[from] LifecycleQuit),
    /// The timeout elapsed while the runner was still acquiring
    #[error("timed out waiting for the first token")]
    Elapsed,
}

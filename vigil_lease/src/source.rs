//! Collaborator seams to the credential backend
//!
//! The lifecycle depends on exactly two remote operations. Transport,
//! timeouts, and response parsing are the implementor's concern; the
//! runner only distinguishes success from failure.

use async_trait::async_trait;

use crate::{error::BackendError, token::AuthResult};

/// Obtains a fresh lease from the backend
#[async_trait]
pub trait Login: Send + Sync + 'static {
    /// Performs a login, returning the granted lease
    async fn login(&self) -> Result<AuthResult, BackendError>;
}

/// Extends an existing lease
#[async_trait]
pub trait Renew: Send + Sync + 'static {
    /// Renews `token`, returning the lease with its refreshed validity
    ///
    /// Implementations must report the remaining validity and
    /// renewability as granted by the backend; both may differ from the
    /// values on `token` when server-side policy has changed or a
    /// maximum TTL is being approached.
    async fn renew(&self, token: &AuthResult) -> Result<AuthResult, BackendError>;
}

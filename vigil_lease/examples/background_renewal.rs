//! Keeps a lease continuously valid against a toy in-process backend,
//! pulling the current token every few seconds.
//!
//! Run with `RUST_LOG=debug cargo run --example background_renewal` to
//! watch the renew loop and re-acquisitions happen in the background.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vigil_clock::DurationSecs;
use vigil_lease::{AuthResult, BackendError, LifecycleHandle, Login, Renew};

/// A stand-in for a real secret-store client
#[derive(Clone)]
struct DemoBackend {
    issued: Arc<AtomicU64>,
}

#[async_trait]
impl Login for DemoBackend {
    async fn login(&self) -> Result<AuthResult, BackendError> {
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(AuthResult::new(
            format!("s.demo-{n}"),
            DurationSecs(30),
            true,
        ))
    }
}

#[async_trait]
impl Renew for DemoBackend {
    async fn renew(&self, token: &AuthResult) -> Result<AuthResult, BackendError> {
        Ok(AuthResult::new(
            token.client_token().as_str(),
            DurationSecs(30),
            true,
        ))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let backend = DemoBackend {
        issued: Arc::new(AtomicU64::new(0)),
    };

    let handle = LifecycleHandle::builder()
        .login(backend.clone())
        .renew(backend)
        .spawn()?;

    let reader = handle.ready().await?;
    tracing::info!(
        token = format_args!("{:#?}", reader.latest().token().client_token()),
        "first lease"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(5));
    loop {
        interval.tick().await;

        let lease = reader.latest();
        tracing::info!(
            token = format_args!("{:#?}", lease.token().client_token()),
            expiration = %lease.expiration(),
            "pulled lease"
        );
    }
}

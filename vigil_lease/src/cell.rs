//! Publication of the current token
//!
//! A single writer (the runner) replaces the published token; any number
//! of readers observe it. The slot starts empty and is never emptied
//! again after the first store, which is what makes the readiness
//! barrier one-shot.

use std::sync::Arc;

use tokio::sync::watch;

use crate::token::TokenWithExpiration;

/// The published value: empty until the first successful login
pub(crate) type Slot = Option<Arc<TokenWithExpiration>>;

/// Writer side of the publication slot
///
/// Backed by a watch channel, which provides the store-release /
/// load-acquire ordering readers rely on: anyone observing a non-empty
/// slot observes the fully constructed token behind it.
#[derive(Debug)]
pub(crate) struct TokenCell {
    tx: watch::Sender<Slot>,
}

impl TokenCell {
    /// Creates an empty cell and the receiver that handles observe it through
    pub(crate) fn new() -> (Self, watch::Receiver<Slot>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }

    /// Replaces the published token
    ///
    /// Returns `false` when nobody can observe the store anymore (every
    /// handle and reader has been dropped); the runner uses that as its
    /// signal to stop refreshing.
    pub(crate) fn store(&self, token: Arc<TokenWithExpiration>) -> bool {
        self.tx.send(Some(token)).is_ok()
    }

    /// Reads the currently published token
    pub(crate) fn load(&self) -> Slot {
        self.tx.borrow().clone()
    }
}

/// Read access to the published token, available once initialized
///
/// Obtained from [`LifecycleHandle::ready`][crate::LifecycleHandle::ready],
/// which guarantees at least one successful login has been published.
#[derive(Clone, Debug)]
pub struct TokenReader {
    rx: watch::Receiver<Slot>,
}

impl TokenReader {
    pub(crate) fn new(rx: watch::Receiver<Slot>) -> Self {
        Self { rx }
    }

    /// Gets the most recently published token
    pub fn latest(&self) -> Arc<TokenWithExpiration> {
        self.rx
            .borrow()
            .clone()
            .expect("token cell is never emptied once initialized")
    }
}

use std::fmt;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use vigil_clock::{DurationSecs, UnixMillis};

/// A bearer credential issued by the backend
///
/// The wrapped secret is kept out of logs: `Debug` and `Display` print a
/// placeholder unless the alternate flag (`{:#?}`/`{:#}`) is used, and
/// even then only a short prefix is revealed by default.
#[derive(Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ClientToken(String);

impl ClientToken {
    /// Wraps a raw token string
    #[inline]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Borrows the raw token, for handing to the backend
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ClientToken {
    #[inline]
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for ClientToken {
    #[inline]
    fn from(token: &str) -> Self {
        Self(token.to_owned())
    }
}

impl fmt::Debug for ClientToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            f.write_str("\"")?;
            limited_reveal(&self.0, &mut *f, 8)?;
            f.write_str("\"")
        } else {
            f.write_str("***CLIENT TOKEN***")
        }
    }
}

impl fmt::Display for ClientToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            limited_reveal(&self.0, &mut *f, usize::MAX)
        } else {
            f.write_str("***CLIENT TOKEN***")
        }
    }
}

fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        match unprotected.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < unprotected.len() => {
                f.write_str(&unprotected[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(unprotected),
        }
    }
}

/// A lease as granted by the backend
///
/// Carries the bearer credential, the granted validity period, and
/// whether the backend will entertain renewal. Accessor and policy
/// metadata are passed through untouched for callers that want them.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuthResult {
    client_token: ClientToken,
    lease_duration: DurationSecs,
    renewable: bool,
    accessor: Option<String>,
    policies: Vec<String>,
}

impl AuthResult {
    /// Constructs a lease from the backend's response values
    pub fn new(
        client_token: impl Into<ClientToken>,
        lease_duration: DurationSecs,
        renewable: bool,
    ) -> Self {
        Self {
            client_token: client_token.into(),
            lease_duration,
            renewable,
            accessor: None,
            policies: Vec::new(),
        }
    }

    /// Attaches the backend's accessor identifier
    pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = Some(accessor.into());
        self
    }

    /// Attaches the policies granted with the lease
    pub fn with_policies(mut self, policies: impl IntoIterator<Item = String>) -> Self {
        self.policies = policies.into_iter().collect();
        self
    }

    /// Gets the bearer credential
    #[inline]
    pub fn client_token(&self) -> &ClientToken {
        &self.client_token
    }

    /// Gets the validity period granted by the backend
    #[inline]
    pub fn lease_duration(&self) -> DurationSecs {
        self.lease_duration
    }

    /// Whether the backend will entertain renewal of this lease
    #[inline]
    pub fn renewable(&self) -> bool {
        self.renewable
    }

    /// Gets the accessor identifier, if the backend provided one
    #[inline]
    pub fn accessor(&self) -> Option<&str> {
        self.accessor.as_deref()
    }

    /// Gets the policies granted with the lease
    #[inline]
    pub fn policies(&self) -> &[String] {
        &self.policies
    }
}

/// A lease paired with its absolute expiration instant
///
/// The expiration is derived from a clock sample taken *before* the
/// network call that produced the lease: any latency on that call is
/// charged against the validity period, so this view of the lease never
/// outlives the backend's.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TokenWithExpiration {
    token: AuthResult,
    expiration: UnixMillis,
}

impl TokenWithExpiration {
    /// Stamps a lease with its expiration
    ///
    /// `now_before_call` must be the clock sample taken before the Login
    /// or Renew request was issued.
    pub fn new(now_before_call: UnixMillis, token: AuthResult) -> Self {
        let expiration = now_before_call + token.lease_duration();
        Self { token, expiration }
    }

    /// Gets the underlying lease
    #[inline]
    pub fn token(&self) -> &AuthResult {
        &self.token
    }

    /// Gets the instant at which the lease expires
    #[inline]
    pub fn expiration(&self) -> UnixMillis {
        self.expiration
    }

    /// Gets how much validity would remain as of the provided time
    #[inline]
    pub fn remaining_at(&self, time: UnixMillis) -> Duration {
        self.expiration - time
    }

    /// Whether the lease would be expired as of the provided time
    #[inline]
    pub fn is_expired_at(&self, time: UnixMillis) -> bool {
        self.expiration <= time
    }
}

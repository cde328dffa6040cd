//! Port abstraction for signing and verifying session credentials.

use chrono::{DateTime, Utc};

use crate::domain::SessionIdentity;

use super::define_port_error;

define_port_error! {
    /// Errors raised by session token adapters.
    pub enum SessionTokenError {
        /// The credential could not be signed.
        Signing { message: String } => "session token signing failed: {message}",
        /// The credential is malformed, forged, or carries unknown claims.
        Invalid { message: String } => "session token invalid: {message}",
        /// The credential is past its expiry.
        Expired => "session token expired",
    }
}

/// Stateless session credentials.
///
/// Verification relies on the signature and expiry alone.
#[cfg_attr(test, mockall::automock)]
pub trait SessionTokens: Send + Sync {
    /// Sign `identity` into an opaque credential.
    fn issue(&self, identity: &SessionIdentity) -> Result<String, SessionTokenError>;

    /// Check a credential's signature and expiry as of `now`.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionIdentity, SessionTokenError>;
}

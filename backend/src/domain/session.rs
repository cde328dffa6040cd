//! Session identities issued after guest verification or login.
//!
//! A session is stateless: it is verified by signature and expiry alone and
//! never stored server side. Identity is passed explicitly to every operation
//! that needs it.

use chrono::{DateTime, Utc};

use super::{Role, UserId};

/// Authenticated caller resolved from a session credential.
///
/// # Examples
/// ```
/// use chrono::{TimeDelta, Utc};
/// use ridebook::domain::{Role, SessionIdentity};
///
/// let identity = SessionIdentity::guest("ada@example.com", Utc::now() + TimeDelta::minutes(30));
/// assert_eq!(identity.role(), Role::Guest);
/// assert!(identity.user_id().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    email: String,
    role: Role,
    user_id: Option<UserId>,
    expires_at: DateTime<Utc>,
}

impl SessionIdentity {
    /// Identity for an email-verified guest.
    pub fn guest(email: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            role: Role::Guest,
            user_id: None,
            expires_at,
        }
    }

    /// Identity for a registered account.
    pub fn account(
        user_id: UserId,
        email: impl Into<String>,
        role: Role,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            email: email.into(),
            role,
            user_id: Some(user_id),
            expires_at,
        }
    }

    /// Email the session is bound to.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Role granted by the session.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Account id for rider and admin sessions.
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Instant after which the session is no longer valid.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the session grants unrestricted booking access.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Signed session credential handed back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    /// Opaque credential to present as a bearer token.
    pub session_token: String,
    /// Seconds until the credential expires.
    pub expires_in: i64,
}

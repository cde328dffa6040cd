//! HS256 JWT implementation of the session token port.
//!
//! Claims follow the account service's access tokens: `sub` (0 for guests),
//! `email`, `role`, `scope`, plus `iat`, `nbf`, `exp`, and `aud`. Expiry is
//! checked against the caller's clock rather than the system time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::domain::ports::{SessionTokenError, SessionTokens};
use crate::domain::{Role, SessionIdentity, UserId};

const GUEST_SCOPE: &str = "guest.bookings:read guest.bookings:write";
const ACCOUNT_SCOPE: &str = "bookings:read bookings:write";

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id, or 0 for guests.
    pub sub: i64,
    /// Bound email.
    pub email: String,
    /// Role name.
    pub role: String,
    /// Space-separated scopes.
    pub scope: String,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Not before, seconds since the epoch.
    pub nbf: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Intended audience.
    pub aud: String,
}

/// Signs and verifies session identities as HS256 JWTs.
#[derive(Clone)]
pub struct JwtSessionTokens {
    secret: Arc<Zeroizing<Vec<u8>>>,
    audience: String,
    clock: Arc<dyn Clock>,
}

impl JwtSessionTokens {
    /// Create an adapter signing with `secret` for `audience`.
    pub fn new(secret: &[u8], audience: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: Arc::new(Zeroizing::new(secret.to_vec())),
            audience: audience.into(),
            clock,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "aud"]);
        validation
    }
}

fn identity_from_claims(claims: SessionClaims) -> Result<SessionIdentity, SessionTokenError> {
    let role: Role = claims
        .role
        .parse()
        .map_err(|err| SessionTokenError::invalid(format!("{err}")))?;
    let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
        .ok_or_else(|| SessionTokenError::invalid("expiry out of range"))?;
    match role {
        Role::Guest => Ok(SessionIdentity::guest(claims.email, expires_at)),
        Role::Rider | Role::Admin if claims.sub > 0 => Ok(SessionIdentity::account(
            UserId::new(claims.sub),
            claims.email,
            role,
            expires_at,
        )),
        Role::Rider | Role::Admin => Err(SessionTokenError::invalid("account token without subject")),
    }
}

impl SessionTokens for JwtSessionTokens {
    fn issue(&self, identity: &SessionIdentity) -> Result<String, SessionTokenError> {
        let now = self.clock.utc().timestamp();
        let (sub, scope) = match identity.user_id() {
            Some(user_id) => (user_id.get(), ACCOUNT_SCOPE),
            None => (0, GUEST_SCOPE),
        };
        let claims = SessionClaims {
            sub,
            email: identity.email().to_owned(),
            role: identity.role().as_str().to_owned(),
            scope: scope.to_owned(),
            iat: now,
            nbf: now,
            exp: identity.expires_at().timestamp(),
            aud: self.audience.clone(),
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_slice()),
        )
        .map_err(|err| SessionTokenError::signing(err.to_string()))
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionIdentity, SessionTokenError> {
        let data = jsonwebtoken::decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_slice()),
            &self.validation(),
        )
        .map_err(|err| SessionTokenError::invalid(err.to_string()))?;
        let claims = data.claims;
        let now = now.timestamp();
        if now < claims.nbf {
            return Err(SessionTokenError::invalid("token not yet valid"));
        }
        if now >= claims.exp {
            return Err(SessionTokenError::Expired);
        }
        identity_from_claims(claims)
    }
}

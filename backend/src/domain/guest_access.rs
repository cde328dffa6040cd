//! Guest access by emailed one-time code or magic link.
//!
//! A request stores one [`GuestAccessCode`] carrying both secrets. The code
//! and the magic token share `used_at`, so redeeming either spends both.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::access_code::{AccessCode, AccessCodeHasher, is_well_formed_code};
use super::contact::{is_valid_email, normalize_email};
use super::ports::{
    GuestAccessRepository, GuestAccessRepositoryError, Mailer, SessionTokens, UserDirectory,
};
use super::{Error, SessionGrant, SessionIdentity};

/// Failed verifications after which a code is locked.
pub const MAX_CODE_ATTEMPTS: i32 = 5;

/// Lifetime of an access code and its magic token.
pub fn code_ttl() -> TimeDelta {
    TimeDelta::minutes(15)
}

/// How long expired codes are kept before clean-up deletes them.
pub fn code_retention() -> TimeDelta {
    TimeDelta::hours(24)
}

const REGISTERED_EMAIL: &str =
    "This email is associated with a registered account. Please login with your password instead.";
const INVALID_CODE: &str = "Invalid or expired code";
const INVALID_MAGIC_LINK: &str = "Invalid or expired magic link";

/// Stored access code record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestAccessCode {
    /// Record id.
    pub id: i64,
    /// Lowercased email the code was sent to.
    pub email: String,
    /// Scrypt hash of the numeric code.
    pub code_hash: String,
    /// Magic link token.
    pub token: String,
    /// End of validity.
    pub expires_at: DateTime<Utc>,
    /// When either secret was redeemed.
    pub used_at: Option<DateTime<Utc>>,
    /// Failed code verifications so far.
    pub attempts: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl GuestAccessCode {
    /// Unused, unexpired, and not locked by failed attempts.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && now < self.expires_at && self.attempts < MAX_CODE_ATTEMPTS
    }
}

/// Access code record ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGuestAccessCode {
    /// Lowercased email.
    pub email: String,
    /// Scrypt hash of the numeric code.
    pub code_hash: String,
    /// Magic link token.
    pub token: String,
    /// End of validity.
    pub expires_at: DateTime<Utc>,
    /// Address the request came from.
    pub ip_created: Option<IpAddr>,
}

/// Tunables for [`GuestAccessService`].
#[derive(Debug, Clone)]
pub struct GuestAccessSettings {
    /// Lifetime of issued guest sessions.
    pub session_ttl: TimeDelta,
    /// Link target; the token is appended as `?token=`.
    pub magic_link_base: String,
}

/// Collaborators of [`GuestAccessService`].
#[derive(Clone)]
pub struct GuestAccessPorts {
    /// Access code storage.
    pub codes: Arc<dyn GuestAccessRepository>,
    /// Registered account lookup.
    pub users: Arc<dyn UserDirectory>,
    /// Session credential signer.
    pub sessions: Arc<dyn SessionTokens>,
    /// Outbound mail.
    pub mailer: Arc<dyn Mailer>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

/// Issues guest access secrets and trades them for guest sessions.
#[derive(Clone)]
pub struct GuestAccessService {
    ports: GuestAccessPorts,
    hasher: AccessCodeHasher,
    settings: GuestAccessSettings,
}

fn storage_error(err: GuestAccessRepositoryError) -> Error {
    debug!(error = %err, "guest access storage failed");
    Error::internal(format!("guest access storage failed: {err}"))
}

/// Normalize and validate an email supplied to a guest endpoint.
pub fn parse_guest_email(raw: &str) -> Result<String, Error> {
    let email = normalize_email(raw);
    if email.is_empty() {
        return Err(Error::invalid_field("email", "required", "Email is required"));
    }
    if !is_valid_email(&email) {
        return Err(Error::invalid_field(
            "email",
            "invalid_email",
            "Invalid email format",
        ));
    }
    Ok(email)
}

impl GuestAccessService {
    /// Create the service.
    pub fn new(
        ports: GuestAccessPorts,
        hasher: AccessCodeHasher,
        settings: GuestAccessSettings,
    ) -> Self {
        Self {
            ports,
            hasher,
            settings,
        }
    }

    /// Issue a code and magic link for `email` and mail them.
    ///
    /// Mail delivery failures are logged and do not fail the request.
    pub async fn request_access(&self, email: &str, ip: Option<IpAddr>) -> Result<(), Error> {
        let email = parse_guest_email(email)?;
        self.reject_registered(&email).await?;

        let code = AccessCode::generate();
        let code_hash = self.hash_code(&code).await?;
        let token = Uuid::new_v4().to_string();
        let record = NewGuestAccessCode {
            email: email.clone(),
            code_hash,
            token: token.clone(),
            expires_at: self.ports.clock.utc() + code_ttl(),
            ip_created: ip,
        };
        self.ports
            .codes
            .create(&record)
            .await
            .map_err(storage_error)?;

        let link = format!("{}?token={token}", self.settings.magic_link_base);
        if let Err(err) = self
            .ports
            .mailer
            .send_guest_access(&email, code.as_str(), &link)
            .await
        {
            warn!(error = %err, "guest access mail was not delivered");
        }
        info!("guest access code issued");
        Ok(())
    }

    /// Redeem the latest code sent to `email`.
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<SessionGrant, Error> {
        let email = parse_guest_email(email)?;
        let code = code.trim();
        if !is_well_formed_code(code) {
            return Err(Error::invalid_field(
                "code",
                "invalid_code",
                "Code must be 6 digits",
            ));
        }
        self.reject_registered(&email).await?;

        let now = self.ports.clock.utc();
        let record = self
            .ports
            .codes
            .latest_for_email(&email)
            .await
            .map_err(storage_error)?
            .filter(|record| record.is_usable(now))
            .ok_or_else(|| Error::unauthorized(INVALID_CODE))?;

        if !self.check_code(&record, code).await? {
            if let Err(err) = self.ports.codes.record_failed_attempt(record.id).await {
                warn!(record_id = record.id, error = %err, "failed to count access code attempt");
            }
            return Err(Error::unauthorized(INVALID_CODE));
        }

        self.redeem(&record, now, INVALID_CODE).await?;
        self.issue_session(email, now)
    }

    /// Redeem a magic link token.
    pub async fn consume_magic(&self, token: &str) -> Result<SessionGrant, Error> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::invalid_field(
                "token",
                "required",
                "Token parameter is required",
            ));
        }

        let now = self.ports.clock.utc();
        let record = self
            .ports
            .codes
            .find_by_token(token)
            .await
            .map_err(storage_error)?
            .filter(|record| record.is_usable(now))
            .ok_or_else(|| Error::unauthorized(INVALID_MAGIC_LINK))?;

        self.reject_registered(&record.email).await?;
        self.redeem(&record, now, INVALID_MAGIC_LINK).await?;
        self.issue_session(record.email, now)
    }

    /// Delete codes that expired longer ago than [`code_retention`].
    pub async fn cleanup_expired(&self) -> Result<u64, Error> {
        let cutoff = self.ports.clock.utc() - code_retention();
        self.ports
            .codes
            .delete_expired(cutoff)
            .await
            .map_err(storage_error)
    }

    async fn reject_registered(&self, email: &str) -> Result<(), Error> {
        let existing = self
            .ports
            .users
            .find_by_email(email)
            .await
            .map_err(|err| Error::internal(format!("account lookup failed: {err}")))?;
        match existing {
            Some(_) => Err(Error::forbidden(REGISTERED_EMAIL)),
            None => Ok(()),
        }
    }

    async fn hash_code(&self, code: &AccessCode) -> Result<String, Error> {
        let hasher = self.hasher.clone();
        let plain = zeroize::Zeroizing::new(code.as_str().to_owned());
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|err| Error::internal(format!("code hashing task failed: {err}")))?
            .map_err(|err| Error::internal(format!("code hashing failed: {err}")))
    }

    async fn check_code(&self, record: &GuestAccessCode, code: &str) -> Result<bool, Error> {
        let hasher = self.hasher.clone();
        let stored = record.code_hash.clone();
        let candidate = zeroize::Zeroizing::new(code.to_owned());
        let outcome = tokio::task::spawn_blocking(move || hasher.verify(&stored, &candidate))
            .await
            .map_err(|err| Error::internal(format!("code check task failed: {err}")))?;
        match outcome {
            Ok(matches) => Ok(matches),
            Err(err) => {
                warn!(record_id = record.id, error = %err, "stored access code hash unusable");
                Ok(false)
            }
        }
    }

    async fn redeem(
        &self,
        record: &GuestAccessCode,
        now: DateTime<Utc>,
        failure: &'static str,
    ) -> Result<(), Error> {
        let marked = self
            .ports
            .codes
            .mark_used(record.id, now)
            .await
            .map_err(storage_error)?;
        if marked {
            info!(record_id = record.id, "guest access redeemed");
            Ok(())
        } else {
            Err(Error::unauthorized(failure))
        }
    }

    fn issue_session(&self, email: String, now: DateTime<Utc>) -> Result<SessionGrant, Error> {
        let identity = SessionIdentity::guest(email, now + self.settings.session_ttl);
        let session_token = self
            .ports
            .sessions
            .issue(&identity)
            .map_err(|err| Error::internal(format!("session signing failed: {err}")))?;
        Ok(SessionGrant {
            session_token,
            expires_in: self.settings.session_ttl.num_seconds(),
        })
    }
}

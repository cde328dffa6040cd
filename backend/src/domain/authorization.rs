//! Resolution of booking credentials into access decisions.
//!
//! A manage token is a capability for one booking and wins over any session.
//! Without one, a verified session must own the booking. Ownership failures
//! are reported as not found so callers cannot probe for booking ids.

use std::sync::Arc;

use mockable::Clock;
use tracing::debug;

use super::ports::{BookingRepository, BookingRepositoryError, SessionTokens};
use super::{Booking, BookingId, Error, ManageToken, SessionIdentity};

const TOKEN_MISS: &str = "Booking not found or invalid access token";
const NOT_FOUND: &str = "Booking not found";
const NO_CREDENTIAL: &str = "Authentication required. Provide either manage_token or valid guest session";

/// Credential presented for a single booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingCredential {
    /// Per-booking capability secret.
    ManageToken(ManageToken),
    /// Verified session identity.
    Session(SessionIdentity),
    /// Nothing usable was presented.
    Anonymous,
}

impl BookingCredential {
    /// Pick the credential to use, preferring the manage token.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use ridebook::domain::{BookingCredential, ManageToken, SessionIdentity};
    ///
    /// let session = SessionIdentity::guest("ada@example.com", Utc::now());
    /// let credential = BookingCredential::from_parts(
    ///     Some(ManageToken::from_string("t-1")),
    ///     Some(session),
    /// );
    /// assert!(matches!(credential, BookingCredential::ManageToken(_)));
    /// ```
    pub fn from_parts(token: Option<ManageToken>, session: Option<SessionIdentity>) -> Self {
        match (token, session) {
            (Some(token), _) => Self::ManageToken(token),
            (None, Some(identity)) => Self::Session(identity),
            (None, None) => Self::Anonymous,
        }
    }
}

/// How access to a booking was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessGrant {
    /// The caller holds the booking's manage token.
    Capability,
    /// The caller's session owns the booking, or is an admin.
    Owner,
}

/// Booking together with the grant that exposed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBooking {
    /// The booking.
    pub booking: Booking,
    /// How access was granted.
    pub grant: AccessGrant,
}

impl ResolvedBooking {
    /// Whether the manage token may be shown to the caller.
    pub fn exposes_token(&self) -> bool {
        self.grant == AccessGrant::Capability
    }
}

/// Whether `identity` owns `booking`.
pub fn session_owns(identity: &SessionIdentity, booking: &Booking) -> bool {
    identity.is_admin()
        || identity.email().eq_ignore_ascii_case(&booking.rider_email)
        || identity
            .user_id()
            .is_some_and(|user_id| booking.user_id == Some(user_id))
}

pub(crate) fn booking_storage_error(err: BookingRepositoryError) -> Error {
    debug!(error = %err, "booking storage failed");
    Error::internal(format!("booking storage failed: {err}"))
}

/// Resolves credentials against stored bookings.
#[derive(Clone)]
pub struct AuthorizationResolver {
    bookings: Arc<dyn BookingRepository>,
    sessions: Arc<dyn SessionTokens>,
    clock: Arc<dyn Clock>,
}

impl AuthorizationResolver {
    /// Create a resolver.
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        sessions: Arc<dyn SessionTokens>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            sessions,
            clock,
        }
    }

    /// Verify a session credential. Invalid or expired credentials yield
    /// `None`.
    pub fn identify(&self, token: Option<&str>) -> Option<SessionIdentity> {
        let token = token?.trim();
        if token.is_empty() {
            return None;
        }
        match self.sessions.verify(token, self.clock.utc()) {
            Ok(identity) => Some(identity),
            Err(err) => {
                debug!(error = %err, "session credential rejected");
                None
            }
        }
    }

    /// Resolve access to booking `id`.
    ///
    /// # Errors
    /// - `unauthorized` when no usable credential was presented.
    /// - `not_found` when the booking is missing, the token does not match,
    ///   or the session does not own the booking.
    pub async fn resolve(
        &self,
        id: BookingId,
        credential: &BookingCredential,
    ) -> Result<ResolvedBooking, Error> {
        match credential {
            BookingCredential::ManageToken(token) => {
                let booking = self
                    .bookings
                    .find_by_id_and_token(id, token)
                    .await
                    .map_err(booking_storage_error)?
                    .ok_or_else(|| Error::not_found(TOKEN_MISS))?;
                Ok(ResolvedBooking {
                    booking,
                    grant: AccessGrant::Capability,
                })
            }
            BookingCredential::Session(identity) => {
                let booking = self
                    .bookings
                    .find_by_id(id)
                    .await
                    .map_err(booking_storage_error)?
                    .filter(|booking| session_owns(identity, booking))
                    .ok_or_else(|| Error::not_found(NOT_FOUND))?;
                Ok(ResolvedBooking {
                    booking,
                    grant: AccessGrant::Owner,
                })
            }
            BookingCredential::Anonymous => Err(Error::unauthorized(NO_CREDENTIAL)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockBookingRepository, MockSessionTokens, SessionTokenError};
    use crate::domain::{ErrorCode, Role, UserId};
    use crate::test_support::{MutableClock, fixed_now, sample_booking};
    use chrono::TimeDelta;
    use rstest::rstest;

    fn resolver(bookings: MockBookingRepository, sessions: MockSessionTokens) -> AuthorizationResolver {
        AuthorizationResolver::new(
            Arc::new(bookings),
            Arc::new(sessions),
            Arc::new(MutableClock::new(fixed_now())),
        )
    }

    fn guest(email: &str) -> SessionIdentity {
        SessionIdentity::guest(email, fixed_now() + TimeDelta::minutes(30))
    }

    fn repo_with(booking: Booking) -> MockBookingRepository {
        let mut repo = MockBookingRepository::new();
        let by_id = booking.clone();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(by_id.clone())));
        repo.expect_find_by_id_and_token()
            .returning(move |_, token| {
                Ok((token == &booking.manage_token).then(|| booking.clone()))
            });
        repo
    }

    #[rstest]
    #[tokio::test]
    async fn manage_token_grants_capability_over_foreign_session() {
        let booking = sample_booking(BookingId::new(1));
        let credential = BookingCredential::from_parts(
            Some(booking.manage_token.clone()),
            Some(guest("mallory@example.com")),
        );
        let resolved = resolver(repo_with(booking), MockSessionTokens::new())
            .resolve(BookingId::new(1), &credential)
            .await
            .expect("token grants access");
        assert_eq!(resolved.grant, AccessGrant::Capability);
        assert!(resolved.exposes_token());
    }

    #[rstest]
    #[tokio::test]
    async fn wrong_token_is_not_found() {
        let booking = sample_booking(BookingId::new(1));
        let credential = BookingCredential::ManageToken(ManageToken::from_string("guess"));
        let err = resolver(repo_with(booking), MockSessionTokens::new())
            .resolve(BookingId::new(1), &credential)
            .await
            .expect_err("token mismatch");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), TOKEN_MISS);
    }

    #[rstest]
    #[case::same_email(guest("ADA@example.com"), true)]
    #[case::other_email(guest("bob@example.com"), false)]
    #[case::admin(
        SessionIdentity::account(UserId::new(99), "ops@example.com", Role::Admin, fixed_now()),
        true
    )]
    #[case::linked_rider(
        SessionIdentity::account(UserId::new(5), "rider@example.com", Role::Rider, fixed_now()),
        true
    )]
    #[tokio::test]
    async fn session_ownership(#[case] identity: SessionIdentity, #[case] allowed: bool) {
        let mut booking = sample_booking(BookingId::new(3));
        booking.user_id = Some(UserId::new(5));
        let result = resolver(repo_with(booking), MockSessionTokens::new())
            .resolve(BookingId::new(3), &BookingCredential::Session(identity))
            .await;
        match result {
            Ok(resolved) => {
                assert!(allowed);
                assert!(!resolved.exposes_token());
            }
            Err(err) => {
                assert!(!allowed);
                assert_eq!(err.code(), ErrorCode::NotFound);
            }
        }
    }

    #[rstest]
    #[tokio::test]
    async fn anonymous_is_unauthorized() {
        let err = resolver(MockBookingRepository::new(), MockSessionTokens::new())
            .resolve(BookingId::new(1), &BookingCredential::Anonymous)
            .await
            .expect_err("no credential");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    fn invalid_session_counts_as_absent() {
        let mut sessions = MockSessionTokens::new();
        sessions
            .expect_verify()
            .returning(|_, _| Err(SessionTokenError::Expired));
        let resolver = resolver(MockBookingRepository::new(), sessions);
        assert_eq!(resolver.identify(Some("stale")), None);
        assert_eq!(resolver.identify(Some("  ")), None);
        assert_eq!(resolver.identify(None), None);
    }

    #[rstest]
    fn valid_session_is_identified() {
        let mut sessions = MockSessionTokens::new();
        sessions
            .expect_verify()
            .withf(|token, now| token == "good" && *now == fixed_now())
            .returning(|_, _| Ok(guest("ada@example.com")));
        let resolver = resolver(MockBookingRepository::new(), sessions);
        assert_eq!(resolver.identify(Some("good")), Some(guest("ada@example.com")));
    }
}

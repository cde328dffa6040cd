//! Test utilities for the backend crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is compiled for tests and when the
//! `test-support` feature is enabled.

pub mod clock;
pub mod mailer;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;

use crate::domain::ports::SessionTokens;
use crate::domain::{
    AccessCodeHasher, Booking, BookingId, BookingStatus, GuestAccessSettings, ManageToken,
    RateLimitPolicy, RegisteredUser, RideType, Role, SessionIdentity, UserId,
};
use crate::inbound::http::state::{HttpState, HttpStatePorts, HttpStateSettings};
use crate::outbound::session::JwtSessionTokens;

pub use clock::{MutableClock, fixed_now};
pub use mailer::{RecordingMailer, SentMail};
pub use memory::{
    InMemoryBookings, InMemoryGuestAccessCodes, InMemoryIdempotencyStore, InMemoryRateLimitStore,
    InMemoryUsers,
};

/// Secret used to sign sessions in tests.
pub const TEST_JWT_SECRET: &[u8] = b"test-secret";
/// Audience used to sign sessions in tests.
pub const TEST_JWT_AUDIENCE: &str = "ridebook-api";
/// Magic link base used in tests.
pub const TEST_MAGIC_LINK_BASE: &str = "http://localhost:5173/guest/access/magic";

/// Scrypt hasher with test-friendly cost.
pub fn cheap_hasher() -> AccessCodeHasher {
    AccessCodeHasher::new(4, 8, 1)
        .unwrap_or_else(|error| panic!("cheap scrypt parameters are valid: {error}"))
}

/// Open guest booking for `ada@example.com`, three days after [`fixed_now`].
pub fn sample_booking(id: BookingId) -> Booking {
    let now = fixed_now();
    Booking {
        id,
        manage_token: ManageToken::from_string(format!("manage-{id}")),
        status: BookingStatus::Pending,
        rider_name: "Ada Lovelace".to_owned(),
        rider_email: "ada@example.com".to_owned(),
        rider_phone: "+15550001111".to_owned(),
        pickup: "1 Airport Way".to_owned(),
        dropoff: "22 Harbour Street".to_owned(),
        scheduled_at: now + TimeDelta::days(3),
        notes: None,
        passengers: 2,
        luggages: 1,
        ride_type: RideType::PerRide,
        user_id: None,
        driver_id: None,
        reschedule_count: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Registered account with a predictable email.
pub fn sample_user(id: i64, role: Role) -> RegisteredUser {
    RegisteredUser {
        id: UserId::new(id),
        name: format!("User {id}"),
        email: format!("user{id}@example.com"),
        phone: "+15550009999".to_owned(),
        role,
    }
}

/// Knobs for [`TestApp`].
#[derive(Debug, Clone)]
pub struct TestAppOptions {
    pub users: Vec<RegisteredUser>,
    pub access_limit: RateLimitPolicy,
    pub booking_limit: RateLimitPolicy,
    pub rate_limit_fail_open: bool,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            access_limit: RateLimitPolicy::new(5, Duration::from_secs(60)),
            booking_limit: RateLimitPolicy::new(30, Duration::from_secs(60)),
            rate_limit_fail_open: true,
        }
    }
}

/// HTTP state over in-memory adapters, with handles on every adapter.
pub struct TestApp {
    pub clock: Arc<MutableClock>,
    pub bookings: Arc<InMemoryBookings>,
    pub idempotency: Arc<InMemoryIdempotencyStore>,
    pub codes: Arc<InMemoryGuestAccessCodes>,
    pub rate_limits: Arc<InMemoryRateLimitStore>,
    pub mailer: Arc<RecordingMailer>,
    pub sessions: Arc<JwtSessionTokens>,
    pub state: HttpState,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new(TestAppOptions::default())
    }
}

impl TestApp {
    pub fn new(options: TestAppOptions) -> Self {
        let clock = Arc::new(MutableClock::new(fixed_now()));
        let bookings = Arc::new(InMemoryBookings::default());
        let idempotency = Arc::new(InMemoryIdempotencyStore::default());
        let codes = Arc::new(InMemoryGuestAccessCodes::default());
        let rate_limits = Arc::new(InMemoryRateLimitStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let sessions = Arc::new(JwtSessionTokens::new(
            TEST_JWT_SECRET,
            TEST_JWT_AUDIENCE,
            clock.clone(),
        ));
        let users = options
            .users
            .into_iter()
            .fold(InMemoryUsers::default(), InMemoryUsers::with_user);

        let state = HttpState::new(
            HttpStatePorts {
                bookings: bookings.clone(),
                idempotency: idempotency.clone(),
                access_codes: codes.clone(),
                users: Arc::new(users),
                sessions: sessions.clone(),
                mailer: mailer.clone(),
                rate_limits: rate_limits.clone(),
                clock: clock.clone(),
            },
            HttpStateSettings {
                access_limit: options.access_limit,
                booking_limit: options.booking_limit,
                rate_limit_fail_open: options.rate_limit_fail_open,
                guest_access: GuestAccessSettings {
                    session_ttl: TimeDelta::minutes(30),
                    magic_link_base: TEST_MAGIC_LINK_BASE.to_owned(),
                },
                code_hasher: cheap_hasher(),
            },
        );

        Self {
            clock,
            bookings,
            idempotency,
            codes,
            rate_limits,
            mailer,
            sessions,
            state,
        }
    }

    /// Signed guest session for `email`, valid for 30 minutes.
    pub fn guest_session(&self, email: &str) -> String {
        let identity = SessionIdentity::guest(email, fixed_now() + TimeDelta::minutes(30));
        self.sign(&identity)
    }

    /// Signed account session for `user`, valid for 30 minutes.
    pub fn account_session(&self, user: &RegisteredUser) -> String {
        let identity = SessionIdentity::account(
            user.id,
            user.email.clone(),
            user.role,
            fixed_now() + TimeDelta::minutes(30),
        );
        self.sign(&identity)
    }

    fn sign(&self, identity: &SessionIdentity) -> String {
        self.sessions
            .issue(identity)
            .unwrap_or_else(|error| panic!("test session signs: {error}"))
    }
}

pub mod openapi {
    //! OpenAPI schema traversal helpers.
    //!
    //! Resolves `RefOr<Schema>` wrappers to concrete `Object` schemas with
    //! diagnostic messages on type mismatches.

    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::{Object, Schema};

    /// Extract an `Object` schema, panicking with a diagnostic if not an Object.
    pub fn unwrap_object_schema<'a>(schema: &'a RefOr<Schema>, name: &str) -> &'a Object {
        match schema {
            RefOr::T(Schema::Object(obj)) => obj,
            RefOr::Ref(reference) => {
                panic!(
                    "schema '{name}' is a $ref to '{}'; resolve the reference first",
                    reference.ref_location
                );
            }
            RefOr::T(Schema::AllOf(_)) => {
                panic!("schema '{name}' is an AllOf combinator; inspect composed schemas");
            }
            RefOr::T(Schema::OneOf(_)) => {
                panic!("schema '{name}' is a OneOf combinator; inspect variant schemas");
            }
            _ => panic!("schema '{name}' is not an Object"),
        }
    }

    /// Get a property from an Object schema by name.
    pub fn get_property<'a>(obj: &'a Object, field: &str) -> &'a RefOr<Schema> {
        match obj.properties.get(field) {
            Some(property) => property,
            None => panic!("property '{field}' not found"),
        }
    }
}

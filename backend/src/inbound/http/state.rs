//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and remain testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{
    BookingRepository, GuestAccessRepository, IdempotencyStore, Mailer, RateLimitStore,
    SessionTokens, UserDirectory,
};
use crate::domain::{
    AccessCodeHasher, AuthorizationResolver, BookingService, BookingServicePorts,
    GuestAccessPorts, GuestAccessService, GuestAccessSettings, RateLimitPolicy, RateLimiter,
};

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub bookings: Arc<dyn BookingRepository>,
    pub idempotency: Arc<dyn IdempotencyStore>,
    pub access_codes: Arc<dyn GuestAccessRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub sessions: Arc<dyn SessionTokens>,
    pub mailer: Arc<dyn Mailer>,
    pub rate_limits: Arc<dyn RateLimitStore>,
    pub clock: Arc<dyn Clock>,
}

/// Tunables applied by the HTTP layer and the services it builds.
#[derive(Debug, Clone)]
pub struct HttpStateSettings {
    /// Limit for the guest access endpoints, per IP and per email.
    pub access_limit: RateLimitPolicy,
    /// Limit for guest booking creation, per IP.
    pub booking_limit: RateLimitPolicy,
    /// Allow requests when the counter store is unavailable.
    pub rate_limit_fail_open: bool,
    pub guest_access: GuestAccessSettings,
    pub code_hasher: AccessCodeHasher,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub bookings: BookingService,
    pub guest_access: GuestAccessService,
    pub resolver: AuthorizationResolver,
    pub limiter: RateLimiter,
    pub access_limit: RateLimitPolicy,
    pub booking_limit: RateLimitPolicy,
}

impl HttpState {
    /// Wire the domain services over `ports`.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// use chrono::TimeDelta;
    /// use mockable::DefaultClock;
    /// use ridebook::domain::ports::{
    ///     FixtureIdempotencyStore, FixtureMailer, FixtureRateLimitStore, FixtureUserDirectory,
    /// };
    /// use ridebook::domain::{AccessCodeHasher, GuestAccessSettings, RateLimitPolicy};
    /// use ridebook::inbound::http::state::{HttpState, HttpStatePorts, HttpStateSettings};
    /// use ridebook::outbound::session::JwtSessionTokens;
    /// # fn bookings() -> Arc<dyn ridebook::domain::ports::BookingRepository> { unimplemented!() }
    /// # fn codes() -> Arc<dyn ridebook::domain::ports::GuestAccessRepository> { unimplemented!() }
    ///
    /// let clock = Arc::new(DefaultClock);
    /// let ports = HttpStatePorts {
    ///     bookings: bookings(),
    ///     idempotency: Arc::new(FixtureIdempotencyStore),
    ///     access_codes: codes(),
    ///     users: Arc::new(FixtureUserDirectory),
    ///     sessions: Arc::new(JwtSessionTokens::new(b"secret", "ridebook-api", clock.clone())),
    ///     mailer: Arc::new(FixtureMailer),
    ///     rate_limits: Arc::new(FixtureRateLimitStore),
    ///     clock,
    /// };
    /// let settings = HttpStateSettings {
    ///     access_limit: RateLimitPolicy::new(5, Duration::from_secs(60)),
    ///     booking_limit: RateLimitPolicy::new(30, Duration::from_secs(60)),
    ///     rate_limit_fail_open: true,
    ///     guest_access: GuestAccessSettings {
    ///         session_ttl: TimeDelta::minutes(30),
    ///         magic_link_base: "http://localhost:5173/guest/access/magic".into(),
    ///     },
    ///     code_hasher: AccessCodeHasher::standard(),
    /// };
    /// let _state = HttpState::new(ports, settings);
    /// ```
    pub fn new(ports: HttpStatePorts, settings: HttpStateSettings) -> Self {
        let HttpStatePorts {
            bookings,
            idempotency,
            access_codes,
            users,
            sessions,
            mailer,
            rate_limits,
            clock,
        } = ports;
        let HttpStateSettings {
            access_limit,
            booking_limit,
            rate_limit_fail_open,
            guest_access,
            code_hasher,
        } = settings;

        let resolver =
            AuthorizationResolver::new(bookings.clone(), sessions.clone(), clock.clone());
        let booking_service = BookingService::new(
            BookingServicePorts {
                bookings,
                idempotency,
                users: users.clone(),
                clock: clock.clone(),
            },
            resolver.clone(),
        );
        let guest_access = GuestAccessService::new(
            GuestAccessPorts {
                codes: access_codes,
                users,
                sessions,
                mailer,
                clock: clock.clone(),
            },
            code_hasher,
            guest_access,
        );
        Self {
            bookings: booking_service,
            guest_access,
            resolver,
            limiter: RateLimiter::new(rate_limits, clock, rate_limit_fail_open),
            access_limit,
            booking_limit,
        }
    }
}

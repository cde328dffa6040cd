//! Domain primitives, policies, and services.
//!
//! Purpose: hold the booking rules independent of HTTP and storage. Services
//! depend only on the port traits in [`ports`]; adapters live under
//! `inbound` and `outbound`.
//!
//! Public surface:
//! - Error (alias to `error::Error`) — transport agnostic failure payload.
//! - RateLimiter — fixed-window limiting over a shared counter store.
//! - GuestAccessService — one-time codes and magic links for guests.
//! - BookingService — booking creation, reads, patches, cancellation.
//! - AuthorizationResolver — manage token and session access decisions.

mod access_code;
mod authorization;
mod booking;
mod booking_service;
pub mod contact;
pub mod error;
mod fingerprint;
mod guest_access;
mod idempotency;
pub mod ports;
mod rate_limit;
mod session;
mod trace_id;
mod user;

pub use self::access_code::{
    ACCESS_CODE_LEN, AccessCode, AccessCodeHashError, AccessCodeHasher, is_well_formed_code,
};
pub use self::authorization::{
    AccessGrant, AuthorizationResolver, BookingCredential, ResolvedBooking, session_owns,
};
pub use self::booking::{
    Booking, BookingChanges, BookingId, BookingListQuery, BookingOwner, BookingPatch,
    BookingStatus, ContactDraft, DEFAULT_PAGE_SIZE, LUGGAGES, MAX_PAGE_SIZE, MAX_RESCHEDULES,
    ManageToken, NewBooking, PASSENGERS, RideType, RiderContact, TripDetails, TripDraft,
    UnknownVariant, cancellation_cutoff,
};
pub use self::booking_service::{
    BookingService, BookingServicePorts, CreatedBooking, GuestBookingDraft,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError, PolicyReason};
pub use self::fingerprint::KeyHash;
pub use self::guest_access::{
    GuestAccessCode, GuestAccessPorts, GuestAccessService, GuestAccessSettings,
    MAX_CODE_ATTEMPTS, NewGuestAccessCode, code_retention, code_ttl, parse_guest_email,
};
pub use self::idempotency::{
    IdempotencyKey, IdempotencyKeyValidationError, MAX_IDEMPOTENCY_KEY_LEN, PayloadHash,
    PayloadHashError, Reservation, canonicalize_and_hash, completed_ttl, reservation_ttl,
};
pub use self::rate_limit::{RateLimitHit, RateLimitKey, RateLimitPolicy, RateLimiter};
pub use self::session::{SessionGrant, SessionIdentity};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{RegisteredUser, Role, UnknownRole, UserId};


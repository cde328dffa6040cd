//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven adapters (PostgreSQL, the mail provider, the session signer)
//! implement these traits. Each port reports failures through its own error
//! enum so services map them predictably.

mod macros;
pub(crate) use macros::define_port_error;

mod booking_repository;
mod guest_access_repository;
mod idempotency_store;
mod mailer;
mod rate_limit_store;
mod session_tokens;
mod user_directory;

#[cfg(test)]
pub use booking_repository::MockBookingRepository;
pub use booking_repository::{BookingRepository, BookingRepositoryError};
#[cfg(test)]
pub use guest_access_repository::MockGuestAccessRepository;
pub use guest_access_repository::{GuestAccessRepository, GuestAccessRepositoryError};
#[cfg(test)]
pub use idempotency_store::MockIdempotencyStore;
pub use idempotency_store::{FixtureIdempotencyStore, IdempotencyStore, IdempotencyStoreError};
#[cfg(test)]
pub use mailer::MockMailer;
pub use mailer::{FixtureMailer, Mailer, MailerError};
#[cfg(test)]
pub use rate_limit_store::MockRateLimitStore;
pub use rate_limit_store::{FixtureRateLimitStore, RateLimitStore, RateLimitStoreError};
#[cfg(test)]
pub use session_tokens::MockSessionTokens;
pub use session_tokens::{SessionTokenError, SessionTokens};
#[cfg(test)]
pub use user_directory::MockUserDirectory;
pub use user_directory::{FixtureUserDirectory, UserDirectory, UserDirectoryError};

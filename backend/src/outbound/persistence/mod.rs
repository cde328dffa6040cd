//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Each adapter implements one domain port over a shared [`DbPool`]. Row
//! structs (`models.rs`) and table definitions (`schema.rs`) stay private to
//! this module. Every call is bounded by
//! [`diesel_helpers::QUERY_TIMEOUT`].
//!
//! # Example
//!
//! ```ignore
//! use ridebook::outbound::persistence::{DbPool, DieselBookingRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/ridebook")).await?;
//! let bookings = DieselBookingRepository::new(pool);
//! ```

pub(crate) mod diesel_helpers;
mod diesel_booking_repository;
mod diesel_guest_access_repository;
mod diesel_idempotency_store;
mod diesel_rate_limit_store;
mod diesel_user_directory;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_booking_repository::DieselBookingRepository;
pub use diesel_guest_access_repository::DieselGuestAccessRepository;
pub use diesel_idempotency_store::DieselIdempotencyStore;
pub use diesel_rate_limit_store::DieselRateLimitStore;
pub use diesel_user_directory::DieselUserDirectory;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};

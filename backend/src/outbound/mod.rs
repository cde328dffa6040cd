//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL stores and repositories using Diesel.
//! - **session**: signed session credentials.
//! - **mailer**: guest access mail delivery.
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod mailer;
pub mod persistence;
pub mod session;

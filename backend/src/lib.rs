//! Backend library modules.
//!
//! Hexagonal layout: [`domain`] holds the booking rules and port traits,
//! [`inbound`] adapts HTTP requests onto domain services, [`outbound`]
//! implements the ports over PostgreSQL, the mail provider and the session
//! signer, and [`server`] wires them together.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;

//! Session credential adapters.

mod jwt;

pub use jwt::{JwtSessionTokens, SessionClaims};

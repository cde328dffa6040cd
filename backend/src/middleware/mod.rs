//! Request middleware.
//!
//! Purpose: request lifecycle concerns shared by every route, currently
//! trace identifiers.

pub mod trace;

pub use trace::Trace;

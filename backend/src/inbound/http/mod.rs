//! HTTP inbound adapter exposing REST endpoints.
//!
//! Every booking route lives under `/api/v1`; [`configure_api`] registers
//! them on a scope.

pub mod admin_bookings;
pub mod booking_dto;
pub mod client_ip;
pub mod error;
pub mod guest_access;
pub mod guest_bookings;
pub mod health;
pub mod idempotency;
pub mod rider_bookings;
pub mod schemas;
pub mod session;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

use actix_web::web;

use crate::domain::Error;

pub use error::ApiResult;

/// Body and query extractor settings that report failures as domain errors.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        Error::invalid_request(format!("Invalid request body: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        Error::invalid_request(format!("Invalid query string: {err}")).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|_err, _req| {
        Error::invalid_request("Invalid booking ID").into()
    }));
}

/// Register every `/api/v1` route.
///
/// # Examples
/// ```no_run
/// use actix_web::{App, web};
/// use ridebook::inbound::http::configure_api;
///
/// let app = App::new().service(web::scope("/api/v1").configure(configure_api));
/// ```
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    extractor_configs(cfg);
    cfg.service(guest_access::request_access)
        .service(guest_access::verify_code)
        .service(guest_access::consume_magic)
        .service(guest_bookings::create_guest_booking)
        .service(guest_bookings::list_guest_bookings)
        .service(guest_bookings::get_guest_booking)
        .service(guest_bookings::patch_guest_booking)
        .service(guest_bookings::cancel_guest_booking)
        .service(rider_bookings::create_rider_booking)
        .service(rider_bookings::list_rider_bookings)
        .service(rider_bookings::get_rider_booking)
        .service(rider_bookings::cancel_rider_booking)
        .service(admin_bookings::admin_cancel_booking);
}

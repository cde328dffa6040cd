//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! document for the REST API. It registers:
//!
//! - **Paths**: guest access, guest/rider/admin booking routes, and probes
//! - **Schemas**: request and response bodies plus wrappers for domain enums
//!   ([`ErrorSchema`], [`ErrorCodeSchema`], [`BookingStatusSchema`],
//!   [`RideTypeSchema`]) so domain types stay free of utoipa derives
//! - **Security**: bearer schemes for guest and account sessions
//!
//! The generated document is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::inbound::http::booking_dto::{
    BookingBody, BookingPatchRequest, GuestBookingCreated, GuestBookingRequest, TripBody,
};
use crate::inbound::http::guest_access::{
    AccessRequestBody, AccessRequestedBody, SessionGrantBody, VerifyCodeBody,
};
use crate::inbound::http::schemas::{
    BookingStatusSchema, ErrorCodeSchema, ErrorSchema, RideTypeSchema,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session bearer schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "GuestSession",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some(
                        "Guest session from POST /api/v1/guest/access/verify or /magic. \
                         Also accepted as the session_token query parameter.",
                    ))
                    .build(),
            ),
        );
        components.add_security_scheme(
            "AccountSession",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Session issued to a registered rider or admin."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Ridebook booking API",
        description = "Guest access, ride booking lifecycle, and health probes.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::guest_access::request_access,
        crate::inbound::http::guest_access::verify_code,
        crate::inbound::http::guest_access::consume_magic,
        crate::inbound::http::guest_bookings::create_guest_booking,
        crate::inbound::http::guest_bookings::list_guest_bookings,
        crate::inbound::http::guest_bookings::get_guest_booking,
        crate::inbound::http::guest_bookings::patch_guest_booking,
        crate::inbound::http::guest_bookings::cancel_guest_booking,
        crate::inbound::http::rider_bookings::create_rider_booking,
        crate::inbound::http::rider_bookings::list_rider_bookings,
        crate::inbound::http::rider_bookings::get_rider_booking,
        crate::inbound::http::rider_bookings::cancel_rider_booking,
        crate::inbound::http::admin_bookings::admin_cancel_booking,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        BookingStatusSchema,
        RideTypeSchema,
        AccessRequestBody,
        AccessRequestedBody,
        VerifyCodeBody,
        SessionGrantBody,
        TripBody,
        GuestBookingRequest,
        GuestBookingCreated,
        BookingPatchRequest,
        BookingBody,
    )),
    tags(
        (name = "guest-access", description = "One-time codes and magic links for guests"),
        (name = "guest-bookings", description = "Bookings managed by token or guest session"),
        (name = "rider-bookings", description = "Bookings of signed-in riders"),
        (name = "admin-bookings", description = "Administrative overrides"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

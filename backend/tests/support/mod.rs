//! Helpers shared by the end-to-end HTTP tests.
//!
//! Integration tests compile as separate crates; each pulls this module in
//! with `mod support;` and uses the subset it needs.
#![allow(dead_code, reason = "each test crate uses a different subset")]

use actix_http::Request;
use actix_web::body::BoxBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web};
use chrono::{DateTime, Utc};
use ridebook::inbound::http::health::HealthState;
use ridebook::server::{AppDependencies, build_app};
use ridebook::test_support::TestApp;
use serde_json::{Value, json};

/// Full application over the in-memory adapters of `app`, marked ready.
pub async fn init_app(
    app: &TestApp,
) -> impl Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error> {
    let health_state = web::Data::new(HealthState::new());
    health_state.mark_ready();
    test::init_service(build_app(AppDependencies {
        health_state,
        http_state: web::Data::new(app.state.clone()),
    }))
    .await
}

pub async fn json_body(res: ServiceResponse) -> Value {
    test::read_body_json(res).await
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// Guest booking body for `email`, picked up at `scheduled_at`.
pub fn guest_booking(email: &str, scheduled_at: DateTime<Utc>) -> Value {
    json!({
        "rider_name": "Ada Lovelace",
        "rider_email": email,
        "rider_phone": "+1 555 000 1111",
        "pickup": "1 Airport Way",
        "dropoff": "22 Harbour Street",
        "scheduled_at": scheduled_at.to_rfc3339(),
        "passengers": 2,
        "luggages": 1,
        "ride_type": "per_ride"
    })
}

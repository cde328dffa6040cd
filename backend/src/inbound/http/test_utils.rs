//! Test helpers for inbound HTTP components.

use actix_web::dev::{Service, ServiceResponse};
use actix_web::{App, test, web};
use serde_json::Value;

use crate::Trace;
use crate::inbound::http::configure_api;
use crate::inbound::http::state::HttpState;

/// Initialise the `/api/v1` routes over `state`, wrapped in [`Trace`].
pub async fn init_api(
    state: &HttpState,
) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Trace)
            .service(web::scope("/api/v1").configure(configure_api)),
    )
    .await
}

/// Bearer header for a session credential.
pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// Read a JSON body, tolerating empty bodies as `null`.
pub async fn json_body(res: ServiceResponse) -> Value {
    let bytes = test::read_body(res).await;
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|error| panic!("JSON body: {error}"))
    }
}

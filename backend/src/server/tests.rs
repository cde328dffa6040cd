//! Tests for server assembly and readiness signalling.

use super::{AppDependencies, ServerConfig, build_app, create_server};
use crate::inbound::http::health::HealthState;
use crate::test_support::TestApp;
use actix_web::http::StatusCode;
use actix_web::{test as actix_test, web};
use rstest::{fixture, rstest};

#[fixture]
fn health_state() -> web::Data<HealthState> {
    web::Data::new(HealthState::new())
}

#[rstest]
#[actix_web::test]
async fn create_server_marks_ready(health_state: web::Data<HealthState>) {
    assert!(!health_state.is_ready(), "state should start unready");
    let app = TestApp::default();
    let config = ServerConfig::new(
        "127.0.0.1:0".parse().expect("loopback address"),
        app.state.clone(),
    );

    let server = create_server(health_state.clone(), config).expect("server should bind");
    assert!(health_state.is_ready(), "server creation marks readiness");

    let handle = server.handle();
    let running = actix_web::rt::spawn(server);
    handle.stop(false).await;
    running
        .await
        .expect("server task should join")
        .expect("server should shut down cleanly");
}

#[rstest]
#[actix_web::test]
async fn app_serves_probes_and_api(health_state: web::Data<HealthState>) {
    let app = TestApp::default();
    let service = actix_test::init_service(build_app(AppDependencies {
        health_state: health_state.clone(),
        http_state: web::Data::new(app.state.clone()),
    }))
    .await;

    let res = actix_test::call_service(
        &service,
        actix_test::TestRequest::get().uri("/health/ready").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    health_state.mark_ready();
    let res = actix_test::call_service(
        &service,
        actix_test::TestRequest::get().uri("/health/ready").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("trace-id"));

    let res = actix_test::call_service(
        &service,
        actix_test::TestRequest::get()
            .uri("/api/v1/guest/bookings")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

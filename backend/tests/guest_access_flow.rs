//! End-to-end guest access: code delivery, session issue, and session-scoped
//! booking reads.

mod support;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use chrono::TimeDelta;
use ridebook::test_support::{TestApp, fixed_now};
use rstest::rstest;
use serde_json::json;
use support::{bearer, guest_booking, init_app, json_body};

async fn issue_session<S>(service: &S, app: &TestApp, email: &str) -> String
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let res = test::call_service(
        service,
        TestRequest::post()
            .uri("/api/v1/guest/access/request")
            .set_json(json!({ "email": email }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let mail = app.mailer.last_for(email).expect("access mail");

    let res = test::call_service(
        service,
        TestRequest::post()
            .uri("/api/v1/guest/access/verify")
            .set_json(json!({ "email": email, "code": mail.code }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    json_body(res).await["session_token"]
        .as_str()
        .expect("session token")
        .to_owned()
}

#[rstest]
#[actix_web::test]
async fn guest_session_lists_only_its_own_bookings() {
    let app = TestApp::default();
    let service = init_app(&app).await;
    for email in ["ada@example.com", "ada@example.com", "bob@example.com"] {
        let res = test::call_service(
            &service,
            TestRequest::post()
                .uri("/api/v1/guest/bookings")
                .set_json(guest_booking(email, fixed_now() + TimeDelta::days(2)))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let session = issue_session(&service, &app, "ada@example.com").await;
    let res = test::call_service(
        &service,
        TestRequest::get()
            .uri("/api/v1/guest/bookings")
            .insert_header(bearer(&session))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let listed = json_body(res).await;
    let listed = listed.as_array().expect("booking list");
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|booking| booking["rider_email"] == "ada@example.com"));
    assert!(listed.iter().all(|booking| booking.get("manage_token").is_none()));
}

#[rstest]
#[actix_web::test]
async fn verified_code_cannot_be_reused() {
    let app = TestApp::default();
    let service = init_app(&app).await;
    issue_session(&service, &app, "ada@example.com").await;
    let mail = app.mailer.last_for("ada@example.com").expect("access mail");

    let res = test::call_service(
        &service,
        TestRequest::post()
            .uri("/api/v1/guest/access/verify")
            .set_json(json!({ "email": "ada@example.com", "code": mail.code }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = test::call_service(
        &service,
        TestRequest::post()
            .uri(&format!("/api/v1/guest/access/magic?token={}", mail.token()))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[actix_web::test]
async fn expired_session_is_treated_as_anonymous() {
    let app = TestApp::default();
    let service = init_app(&app).await;
    let session = issue_session(&service, &app, "ada@example.com").await;
    app.clock.advance_seconds(31 * 60);

    let res = test::call_service(
        &service,
        TestRequest::get()
            .uri("/api/v1/guest/bookings")
            .insert_header(bearer(&session))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

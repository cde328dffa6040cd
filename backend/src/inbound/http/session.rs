//! Session extraction to keep HTTP handlers free of credential parsing.
//!
//! A session credential is read from `Authorization: Bearer <token>` first,
//! then from the `session_token` query parameter. Handlers receive a
//! verified [`SessionIdentity`] or nothing; invalid credentials are treated
//! as absent.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::{Ready, ready};
use serde::Deserialize;

use crate::domain::{Error, Role, SessionIdentity};
use crate::inbound::http::state::HttpState;

/// Query parameter carrying a session credential.
pub const SESSION_TOKEN_PARAM: &str = "session_token";

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Deserialize)]
struct SessionTokenQuery {
    session_token: Option<String>,
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let prefix = value.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    value
        .get(BEARER_PREFIX.len()..)
        .map(|token| token.trim().to_owned())
}

fn query_token(req: &HttpRequest) -> Option<String> {
    web::Query::<SessionTokenQuery>::from_query(req.query_string())
        .ok()
        .and_then(|query| query.into_inner().session_token)
}

/// Raw session credential presented with a request, if any.
pub(crate) fn presented_token(req: &HttpRequest) -> Option<String> {
    bearer_token(req)
        .filter(|token| !token.is_empty())
        .or_else(|| query_token(req))
}

/// Verified session of the caller, if one was presented.
#[derive(Debug, Clone, Default)]
pub struct SessionContext(Option<SessionIdentity>);

impl SessionContext {
    /// Wrap an already verified identity.
    pub fn new(identity: Option<SessionIdentity>) -> Self {
        Self(identity)
    }

    /// Borrow the identity, if any.
    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.0.as_ref()
    }

    /// Take the identity, if any.
    pub fn into_identity(self) -> Option<SessionIdentity> {
        self.0
    }

    /// Require a session or return `401 Unauthorized` with `message`.
    pub fn require(self, message: &str) -> Result<SessionIdentity, Error> {
        self.0.ok_or_else(|| Error::unauthorized(message))
    }

    /// Require an account session with `role`.
    ///
    /// Missing sessions yield `401`; sessions with another role yield `403`.
    pub fn require_role(self, role: Role) -> Result<SessionIdentity, Error> {
        let identity = self.require("Authentication required")?;
        if identity.role() == role && identity.user_id().is_some() {
            Ok(identity)
        } else {
            Err(Error::forbidden(format!("{role} account required")))
        }
    }
}

impl FromRequest for SessionContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<HttpState>>() else {
            return ready(Err(Error::internal("HTTP state is not configured")));
        };
        let identity = state.resolver.identify(presented_token(req).as_deref());
        ready(Ok(Self(identity)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestApp, TestAppOptions, sample_user};
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test};
    use rstest::rstest;

    async fn whoami(session: SessionContext) -> HttpResponse {
        match session.identity() {
            Some(identity) => HttpResponse::Ok().body(identity.email().to_owned()),
            None => HttpResponse::Ok().body("anonymous"),
        }
    }

    async fn riders_only(session: SessionContext) -> Result<HttpResponse, Error> {
        let identity = session.require_role(Role::Rider)?;
        Ok(HttpResponse::Ok().body(identity.email().to_owned()))
    }

    async fn call(app_state: &TestApp, req: test::TestRequest, path: &str) -> (StatusCode, String) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state.state.clone()))
                .route("/whoami", web::get().to(whoami))
                .route("/rider", web::get().to(riders_only)),
        )
        .await;
        let res = test::call_service(&app, req.uri(path).to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[rstest]
    #[actix_web::test]
    async fn bearer_header_is_preferred() {
        let app = TestApp::default();
        let header = format!("Bearer {}", app.guest_session("ada@example.com"));
        let query = app.guest_session("bob@example.com");
        let (status, body) = call(
            &app,
            test::TestRequest::get().insert_header((AUTHORIZATION, header)),
            &format!("/whoami?session_token={query}"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ada@example.com");
    }

    #[rstest]
    #[case::lowercase("bearer")]
    #[case::uppercase("BEARER")]
    #[actix_web::test]
    async fn bearer_scheme_is_case_insensitive(#[case] scheme: &str) {
        let app = TestApp::default();
        let header = format!("{scheme} {}", app.guest_session("ada@example.com"));
        let (_, body) = call(
            &app,
            test::TestRequest::get().insert_header((AUTHORIZATION, header)),
            "/whoami",
        )
        .await;
        assert_eq!(body, "ada@example.com");
    }

    #[rstest]
    #[case::scheme_only("Bearer")]
    #[case::truncated("Bear")]
    #[actix_web::test]
    async fn truncated_bearer_headers_are_anonymous(#[case] header: &str) {
        let app = TestApp::default();
        let (status, body) = call(
            &app,
            test::TestRequest::get().insert_header((AUTHORIZATION, header)),
            "/whoami",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[rstest]
    #[actix_web::test]
    async fn query_parameter_is_accepted() {
        let app = TestApp::default();
        let token = app.guest_session("bob@example.com");
        let (_, body) = call(
            &app,
            test::TestRequest::get(),
            &format!("/whoami?session_token={token}"),
        )
        .await;
        assert_eq!(body, "bob@example.com");
    }

    #[rstest]
    #[case::garbage("Bearer not-a-token")]
    #[case::wrong_scheme("Basic YWRhOnNlY3JldA==")]
    #[actix_web::test]
    async fn unusable_credentials_are_anonymous(#[case] header: &str) {
        let app = TestApp::default();
        let (status, body) = call(
            &app,
            test::TestRequest::get().insert_header((AUTHORIZATION, header)),
            "/whoami",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[rstest]
    #[actix_web::test]
    async fn expired_session_is_anonymous() {
        let app = TestApp::default();
        let token = app.guest_session("ada@example.com");
        app.clock.advance_seconds(31 * 60);
        let (_, body) = call(
            &app,
            test::TestRequest::get().insert_header((AUTHORIZATION, format!("Bearer {token}"))),
            "/whoami",
        )
        .await;
        assert_eq!(body, "anonymous");
    }

    #[rstest]
    #[actix_web::test]
    async fn role_checks_distinguish_missing_from_wrong() {
        let rider = sample_user(1, Role::Rider);
        let admin = sample_user(2, Role::Admin);
        let app = TestApp::new(TestAppOptions {
            users: vec![rider.clone(), admin.clone()],
            ..TestAppOptions::default()
        });

        let (status, _) = call(&app, test::TestRequest::get(), "/rider").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let guest = app.guest_session("ada@example.com");
        let (status, _) = call(
            &app,
            test::TestRequest::get().insert_header((AUTHORIZATION, format!("Bearer {guest}"))),
            "/rider",
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let token = app.account_session(&admin);
        let (status, _) = call(
            &app,
            test::TestRequest::get().insert_header((AUTHORIZATION, format!("Bearer {token}"))),
            "/rider",
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let token = app.account_session(&rider);
        let (status, body) = call(
            &app,
            test::TestRequest::get().insert_header((AUTHORIZATION, format!("Bearer {token}"))),
            "/rider",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, rider.email);
    }
}

//! Guest access HTTP handlers.
//!
//! ```text
//! POST /api/v1/guest/access/request
//! POST /api/v1/guest/access/verify
//! POST /api/v1/guest/access/magic?token=
//! ```

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{RateLimitKey, SessionGrant, parse_guest_email};
use crate::inbound::http::ApiResult;
use crate::inbound::http::client_ip::ClientIp;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

const ACCESS_SENT: &str = "Access code sent to your email";

/// Request for a one-time access code.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AccessRequestBody {
    #[schema(example = "ada@example.com")]
    #[serde(default)]
    pub email: String,
}

/// Acknowledgement that an access code was issued.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AccessRequestedBody {
    #[schema(example = "Access code sent to your email")]
    pub message: String,
}

/// Code verification request.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct VerifyCodeBody {
    #[schema(example = "ada@example.com")]
    #[serde(default)]
    pub email: String,
    #[schema(example = "042917")]
    #[serde(default)]
    pub code: String,
}

/// Magic link parameters.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MagicLinkParams {
    /// Token from the emailed link.
    #[serde(default)]
    pub token: String,
}

/// Guest session credential.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SessionGrantBody {
    /// Bearer credential for guest booking routes.
    pub session_token: String,
    /// Seconds until the credential expires.
    #[schema(example = 1800)]
    pub expires_in: i64,
}

impl From<SessionGrant> for SessionGrantBody {
    fn from(grant: SessionGrant) -> Self {
        Self {
            session_token: grant.session_token,
            expires_in: grant.expires_in,
        }
    }
}

/// Issue a one-time code and magic link for a guest email.
///
/// Rate limited per client address and per email.
#[utoipa::path(
    post,
    path = "/api/v1/guest/access/request",
    request_body = AccessRequestBody,
    responses(
        (status = 200, description = "Access code issued", body = AccessRequestedBody),
        (status = 400, description = "Invalid email", body = ErrorSchema),
        (status = 403, description = "Email belongs to a registered account", body = ErrorSchema),
        (status = 429, description = "Too many requests", body = ErrorSchema),
        (status = 503, description = "Rate limiting unavailable", body = ErrorSchema)
    ),
    tags = ["guest-access"],
    operation_id = "requestGuestAccess",
    security([])
)]
#[post("/guest/access/request")]
pub async fn request_access(
    state: web::Data<HttpState>,
    client: ClientIp,
    payload: web::Json<AccessRequestBody>,
) -> ApiResult<web::Json<AccessRequestedBody>> {
    let email = parse_guest_email(&payload.email)?;
    state
        .limiter
        .enforce(
            &[client.rate_limit_key(), RateLimitKey::email(&email)],
            &state.access_limit,
        )
        .await?;
    state.guest_access.request_access(&email, client.0).await?;
    Ok(web::Json(AccessRequestedBody {
        message: ACCESS_SENT.to_owned(),
    }))
}

/// Exchange an emailed code for a guest session.
#[utoipa::path(
    post,
    path = "/api/v1/guest/access/verify",
    request_body = VerifyCodeBody,
    responses(
        (status = 200, description = "Guest session issued", body = SessionGrantBody),
        (status = 400, description = "Malformed request", body = ErrorSchema),
        (status = 401, description = "Invalid or expired code", body = ErrorSchema),
        (status = 403, description = "Email belongs to a registered account", body = ErrorSchema),
        (status = 429, description = "Too many requests", body = ErrorSchema)
    ),
    tags = ["guest-access"],
    operation_id = "verifyGuestCode",
    security([])
)]
#[post("/guest/access/verify")]
pub async fn verify_code(
    state: web::Data<HttpState>,
    client: ClientIp,
    payload: web::Json<VerifyCodeBody>,
) -> ApiResult<web::Json<SessionGrantBody>> {
    state
        .limiter
        .enforce(&[client.rate_limit_key()], &state.access_limit)
        .await?;
    let grant = state
        .guest_access
        .verify_code(&payload.email, &payload.code)
        .await?;
    Ok(web::Json(grant.into()))
}

/// Exchange a magic link token for a guest session.
#[utoipa::path(
    post,
    path = "/api/v1/guest/access/magic",
    params(MagicLinkParams),
    responses(
        (status = 200, description = "Guest session issued", body = SessionGrantBody),
        (status = 400, description = "Missing token", body = ErrorSchema),
        (status = 401, description = "Invalid or expired magic link", body = ErrorSchema),
        (status = 429, description = "Too many requests", body = ErrorSchema)
    ),
    tags = ["guest-access"],
    operation_id = "consumeMagicLink",
    security([])
)]
#[post("/guest/access/magic")]
pub async fn consume_magic(
    state: web::Data<HttpState>,
    client: ClientIp,
    params: web::Query<MagicLinkParams>,
) -> ApiResult<web::Json<SessionGrantBody>> {
    state
        .limiter
        .enforce(&[client.rate_limit_key()], &state.access_limit)
        .await?;
    let grant = state.guest_access.consume_magic(&params.token).await?;
    Ok(web::Json(grant.into()))
}

#[cfg(test)]
#[path = "guest_access_tests.rs"]
mod tests;

//! Admin booking HTTP handlers.
//!
//! ```text
//! DELETE /api/v1/admin/bookings/{id}
//! ```

use actix_web::{HttpResponse, delete, web};

use crate::domain::BookingId;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Cancel any open booking, ignoring the rider cancellation cutoff.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/bookings/{id}",
    params(("id" = i64, Path, description = "Booking id")),
    responses(
        (status = 204, description = "Booking canceled"),
        (status = 401, description = "Session required", body = ErrorSchema),
        (status = 403, description = "Admin account required", body = ErrorSchema),
        (status = 404, description = "Booking not found or already canceled", body = ErrorSchema),
        (status = 422, description = "Booking already completed", body = ErrorSchema)
    ),
    tags = ["admin-bookings"],
    operation_id = "adminCancelBooking",
    security(("AccountSession" = []))
)]
#[delete("/admin/bookings/{id}")]
pub async fn admin_cancel_booking(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let identity = session.require("Authentication required")?;
    let id = BookingId::new(path.into_inner());
    state.bookings.admin_cancel(id, &identity).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingStatus, Role};
    use crate::inbound::http::test_utils::{bearer, init_api};
    use crate::test_support::{TestApp, TestAppOptions, fixed_now, sample_booking, sample_user};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use chrono::TimeDelta;
    use rstest::rstest;

    #[rstest]
    #[case::admin(Role::Admin, StatusCode::NO_CONTENT, BookingStatus::Canceled)]
    #[case::rider(Role::Rider, StatusCode::FORBIDDEN, BookingStatus::Pending)]
    #[actix_web::test]
    async fn only_admins_skip_the_cutoff(
        #[case] role: Role,
        #[case] expected: StatusCode,
        #[case] final_status: BookingStatus,
    ) {
        let user = sample_user(90, role);
        let app = TestApp::new(TestAppOptions {
            users: vec![user.clone()],
            ..TestAppOptions::default()
        });
        let mut booking = sample_booking(BookingId::new(3));
        booking.scheduled_at = fixed_now() + TimeDelta::hours(2);
        app.bookings.seed(booking);
        let service = init_api(&app.state).await;

        let res = actix_test::call_service(
            &service,
            actix_test::TestRequest::delete()
                .uri("/api/v1/admin/bookings/3")
                .insert_header(bearer(&app.account_session(&user)))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), expected);
        assert_eq!(
            app.bookings.get(BookingId::new(3)).map(|b| b.status),
            Some(final_status)
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn anonymous_callers_are_unauthorized() {
        let app = TestApp::default();
        let service = init_api(&app.state).await;
        let res = actix_test::call_service(
            &service,
            actix_test::TestRequest::delete()
                .uri("/api/v1/admin/bookings/3")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}

//! Periodic removal of expired counters, idempotency rows and access codes.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::domain::Error;
use crate::inbound::http::state::HttpState;

/// Rows removed by one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Rate-limit counters whose window has closed.
    pub rate_limits: u64,
    /// Idempotency records past their retention.
    pub idempotency: u64,
    /// Guest access codes past their retention.
    pub access_codes: u64,
}

impl SweepReport {
    /// Rows removed across all tables.
    pub fn total(&self) -> u64 {
        self.rate_limits + self.idempotency + self.access_codes
    }
}

fn removed(result: Result<u64, Error>, table: &'static str) -> u64 {
    result.unwrap_or_else(|err| {
        warn!(table, error = %err, "expired row cleanup failed");
        0
    })
}

/// Delete expired rows once. Failures are logged and counted as zero.
pub async fn sweep(state: &HttpState) -> SweepReport {
    let report = SweepReport {
        rate_limits: removed(state.limiter.cleanup_expired().await, "rate_limits"),
        idempotency: removed(
            state.bookings.cleanup_idempotency().await,
            "booking_idempotency",
        ),
        access_codes: removed(
            state.guest_access.cleanup_expired().await,
            "guest_access_codes",
        ),
    };
    if report.total() > 0 {
        info!(
            rate_limits = report.rate_limits,
            idempotency = report.idempotency,
            access_codes = report.access_codes,
            "expired rows removed"
        );
    }
    report
}

/// Run [`sweep`] every `period`, starting one period from now.
pub fn spawn_cleanup(state: HttpState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep(&state).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ContactDraft, GuestBookingDraft, IdempotencyKey, RateLimitKey, TripDraft,
    };
    use crate::test_support::{TestApp, fixed_now};
    use chrono::TimeDelta;
    use rstest::rstest;

    fn draft() -> GuestBookingDraft {
        GuestBookingDraft {
            contact: ContactDraft {
                name: "Ada Lovelace".to_owned(),
                email: "ada@example.com".to_owned(),
                phone: "+15550001111".to_owned(),
            },
            trip: TripDraft {
                pickup: "1 Airport Way".to_owned(),
                dropoff: "22 Harbour Street".to_owned(),
                scheduled_at: Some(fixed_now() + TimeDelta::days(3)),
                notes: None,
                passengers: 2,
                luggages: 1,
                ride_type: "per_ride".to_owned(),
            },
        }
    }

    #[rstest]
    #[tokio::test]
    async fn sweep_removes_only_expired_rows() {
        let app = TestApp::default();
        app.state
            .guest_access
            .request_access("ada@example.com", None)
            .await
            .expect("access requested");
        app.state
            .limiter
            .enforce(
                &[RateLimitKey::ip("203.0.113.9")],
                &app.state.access_limit,
            )
            .await
            .expect("under limit");
        let key = IdempotencyKey::new("sweep-1").expect("valid key");
        app.state
            .bookings
            .create_guest(draft(), Some(key))
            .await
            .expect("booking created");

        assert_eq!(sweep(&app.state).await, SweepReport::default());

        app.clock.advance_seconds(2 * 24 * 3600);
        let report = sweep(&app.state).await;
        assert_eq!(report.rate_limits, 1);
        assert_eq!(report.idempotency, 1);
        assert_eq!(report.access_codes, 1);
        assert_eq!(report.total(), 3);
        assert!(app.rate_limits.is_empty());
        assert!(app.codes.records().is_empty());
        assert_eq!(app.bookings.count(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn failing_store_does_not_stop_the_sweep() {
        let app = TestApp::default();
        app.state
            .guest_access
            .request_access("ada@example.com", None)
            .await
            .expect("access requested");
        app.rate_limits.fail(true);
        app.clock.advance_seconds(2 * 24 * 3600);

        let report = sweep(&app.state).await;
        assert_eq!(report.rate_limits, 0);
        assert_eq!(report.access_codes, 1);
    }
}

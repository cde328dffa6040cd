//! Tests for the fixed-window rate limiter.

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::MockRateLimitStore;
use crate::test_support::{MutableClock, fixed_now};
use rstest::rstest;

const POLICY: RateLimitPolicy = RateLimitPolicy::new(5, Duration::from_secs(60));

fn limiter(store: MockRateLimitStore, fail_open: bool) -> RateLimiter {
    RateLimiter::new(
        Arc::new(store),
        Arc::new(MutableClock::new(fixed_now())),
        fail_open,
    )
}

fn store_returning(count: u32) -> MockRateLimitStore {
    let mut store = MockRateLimitStore::new();
    store.expect_record_hit().returning(move |_| Ok(count));
    store
}

#[rstest]
#[case(1, true)]
#[case(5, true)]
#[case(6, false)]
#[tokio::test]
async fn allows_up_to_the_limit(#[case] count: u32, #[case] allowed: bool) {
    let limiter = limiter(store_returning(count), true);
    let key = RateLimitKey::ip("203.0.113.9");
    assert_eq!(limiter.allow(&key, &POLICY).await, Ok(allowed));
}

#[rstest]
#[tokio::test]
async fn hit_carries_hashed_key_and_window() {
    let mut store = MockRateLimitStore::new();
    store
        .expect_record_hit()
        .withf(|hit| {
            hit.key_hash == RateLimitKey::ip("203.0.113.9").hash()
                && hit.window_floor == fixed_now() - TimeDelta::seconds(60)
                && hit.expires_at == fixed_now() + TimeDelta::hours(1)
        })
        .times(1)
        .returning(|_| Ok(1));

    let limiter = limiter(store, true);
    let allowed = limiter
        .allow(&RateLimitKey::ip("203.0.113.9"), &POLICY)
        .await
        .expect("store succeeded");
    assert!(allowed);
}

#[rstest]
#[tokio::test]
async fn store_failure_fails_open_when_configured() {
    let mut store = MockRateLimitStore::new();
    store
        .expect_record_hit()
        .returning(|_| Err(RateLimitStoreError::timeout()));
    let limiter = limiter(store, true);
    assert_eq!(
        limiter.allow(&RateLimitKey::ip("198.51.100.1"), &POLICY).await,
        Ok(true)
    );
}

#[rstest]
#[tokio::test]
async fn store_failure_refuses_when_fail_closed() {
    let mut store = MockRateLimitStore::new();
    store
        .expect_record_hit()
        .returning(|_| Err(RateLimitStoreError::connection("refused")));
    let limiter = limiter(store, false);
    let err = limiter
        .allow(&RateLimitKey::ip("198.51.100.1"), &POLICY)
        .await
        .expect_err("fail closed");
    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn enforce_stops_at_first_rejected_key() {
    let mut store = MockRateLimitStore::new();
    store.expect_record_hit().times(1).returning(|_| Ok(6));
    let limiter = limiter(store, true);
    let keys = [
        RateLimitKey::ip("203.0.113.9"),
        RateLimitKey::email("ada@example.com"),
    ];
    let err = limiter
        .enforce(&keys, &POLICY)
        .await
        .expect_err("over limit");
    assert_eq!(err.code(), ErrorCode::TooManyRequests);
}

#[rstest]
#[tokio::test]
async fn enforce_counts_every_key_when_allowed() {
    let mut store = MockRateLimitStore::new();
    store.expect_record_hit().times(2).returning(|_| Ok(1));
    let limiter = limiter(store, true);
    let keys = [
        RateLimitKey::ip("203.0.113.9"),
        RateLimitKey::email("ada@example.com"),
    ];
    limiter.enforce(&keys, &POLICY).await.expect("allowed");
}

#[rstest]
fn distinct_scopes_hash_differently() {
    assert_ne!(
        RateLimitKey::ip("ada@example.com").hash(),
        RateLimitKey::email("ada@example.com").hash()
    );
    let ip = RateLimitKey::ip("203.0.113.9");
    assert_ne!(ip.scoped("guest_booking").hash(), ip.hash());
}

#[rstest]
fn key_debug_hides_plaintext() {
    let key = RateLimitKey::email("ada@example.com");
    assert!(!format!("{key:?}").contains("ada@example.com"));
}

#[rstest]
#[tokio::test]
async fn cleanup_reports_deleted_rows() {
    let mut store = MockRateLimitStore::new();
    store
        .expect_delete_expired()
        .withf(|now| *now == fixed_now())
        .returning(|_| Ok(4));
    let limiter = limiter(store, true);
    assert_eq!(limiter.cleanup_expired().await, Ok(4));
}

#[rstest]
#[tokio::test]
async fn window_rejects_overflow_then_resets() {
    use crate::test_support::InMemoryRateLimitStore;

    let store = Arc::new(InMemoryRateLimitStore::default());
    let clock = Arc::new(MutableClock::new(fixed_now()));
    let limiter = RateLimiter::new(store.clone(), clock.clone(), false);
    let key = RateLimitKey::ip("203.0.113.9");

    for _ in 0..POLICY.limit() {
        assert_eq!(limiter.allow(&key, &POLICY).await, Ok(true));
        clock.advance_seconds(5);
    }
    assert_eq!(limiter.allow(&key, &POLICY).await, Ok(false));

    clock.advance_seconds(61);
    assert_eq!(limiter.allow(&key, &POLICY).await, Ok(true));
    assert_eq!(store.count(&key.hash()), Some(1));
}

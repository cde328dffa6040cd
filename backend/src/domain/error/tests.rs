//! Tests for the domain error payload.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[rstest]
fn invalid_request_constructor_sets_code() {
    let err = Error::invalid_request("bad");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn try_with_trace_id_rejects_empty_values() {
    let result = Error::internal("boom").try_with_trace_id("  ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyTraceId)));
}

#[rstest]
fn new_returns_none_when_trace_id_out_of_scope() {
    assert!(Error::internal("boom").trace_id().is_none());
}

#[rstest]
#[tokio::test]
async fn new_captures_trace_id_in_scope(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id.parse().expect("valid UUID");
    let error = TraceId::scope(trace_id, async move { Error::internal("boom") }).await;
    assert_eq!(error.trace_id(), Some(expected_trace_id.as_str()));
}

#[rstest]
#[case(PolicyReason::RescheduleLimitReached, "reschedule_limit_reached")]
#[case(PolicyReason::CancellationCutoff, "cancellation_cutoff")]
#[case(PolicyReason::BookingClosed, "booking_closed")]
fn policy_errors_carry_reason(#[case] reason: PolicyReason, #[case] expected: &str) {
    let err = Error::policy(reason, "refused");
    assert_eq!(err.code(), ErrorCode::PolicyViolation);
    assert_eq!(err.policy_reason(), Some(expected));
}

#[rstest]
fn invalid_field_records_field_and_code() {
    let err = Error::invalid_field("passengers", "out_of_range", "too many");
    assert_eq!(
        err.details(),
        Some(&json!({ "field": "passengers", "code": "out_of_range" }))
    );
}

#[rstest]
fn serializes_with_snake_case_trace_id(expected_trace_id: String) {
    let err = Error::not_found("gone").with_trace_id(expected_trace_id.clone());
    let value = serde_json::to_value(&err).expect("serialise error");
    assert_eq!(value["code"], "not_found");
    assert_eq!(value["trace_id"], expected_trace_id);
    assert!(value.get("details").is_none());
}

#[rstest]
fn deserialises_camel_case_trace_alias(expected_trace_id: String) {
    let payload = json!({
        "code": "too_many_requests",
        "message": "slow down",
        "traceId": expected_trace_id,
    });
    let err: Error = serde_json::from_value(payload).expect("deserialise error");
    assert_eq!(err.code(), ErrorCode::TooManyRequests);
    assert_eq!(err.trace_id(), Some(TRACE_ID));
}

#[rstest]
fn deserialise_rejects_blank_message() {
    let payload = json!({ "code": "conflict", "message": " " });
    assert!(serde_json::from_value::<Error>(payload).is_err());
}

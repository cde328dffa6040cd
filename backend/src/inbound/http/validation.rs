//! Shared validation helpers for inbound HTTP adapters.
//!
//! Request bodies and query strings carry raw strings; these helpers turn
//! them into domain values and report failures as `invalid_request` with
//! `details.field` and `details.code`.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::{BookingListQuery, BookingStatus, Error};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidTimestamp,
    InvalidNumber,
    InvalidStatus,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidNumber => "invalid_number",
            ErrorCode::InvalidStatus => "invalid_status",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

fn field_error(field: FieldName, code: ErrorCode, message: impl Into<String>) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "code": code.as_str(),
    }))
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(
        field,
        ErrorCode::MissingField,
        format!("missing required field: {name}"),
    )
}

pub(crate) fn require<T>(value: Option<T>, field: FieldName) -> Result<T, Error> {
    value.ok_or_else(|| missing_field_error(field))
}

pub(crate) fn invalid_timestamp_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(
        field,
        ErrorCode::InvalidTimestamp,
        format!("{name} must be an RFC 3339 timestamp"),
    )
}

pub(crate) fn parse_rfc3339_timestamp(value: &str, field: FieldName) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| invalid_timestamp_error(field))
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(|raw| parse_rfc3339_timestamp(raw, field))
        .transpose()
}

fn parse_optional_i64(value: Option<&str>, field: FieldName) -> Result<Option<i64>, Error> {
    let name = field.as_str();
    value
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            raw.trim().parse::<i64>().map_err(|_| {
                field_error(
                    field,
                    ErrorCode::InvalidNumber,
                    format!("Invalid {name} parameter"),
                )
            })
        })
        .transpose()
}

fn parse_status(value: Option<&str>) -> Result<Option<BookingStatus>, Error> {
    value
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            raw.trim().parse::<BookingStatus>().map_err(|_| {
                field_error(
                    FieldName::new("status"),
                    ErrorCode::InvalidStatus,
                    "Invalid status. Must be one of: pending, confirmed, assigned, on_trip, completed, canceled",
                )
            })
        })
        .transpose()
}

/// Build a listing query from raw `status`, `limit`, and `offset` strings.
///
/// Unparseable values are rejected. A parseable limit is clamped to the page
/// bounds and a negative offset becomes zero.
pub(crate) fn parse_list_query(
    status: Option<&str>,
    limit: Option<&str>,
    offset: Option<&str>,
) -> Result<BookingListQuery, Error> {
    Ok(BookingListQuery::new(
        parse_status(status)?,
        parse_optional_i64(limit, FieldName::new("limit"))?,
        parse_optional_i64(offset, FieldName::new("offset"))?,
    ))
}

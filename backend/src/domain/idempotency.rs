//! Idempotency primitives for booking creation.
//!
//! - [`IdempotencyKey`]: client value from the `Idempotency-Key` header.
//! - [`PayloadHash`]: SHA-256 of the canonicalized request payload, used to
//!   detect a key replayed with a different body.
//! - [`Reservation`]: outcome of the atomic reserve-or-fetch step.
//!
//! A request first *reserves* its key. Exactly one concurrent caller wins the
//! reservation and creates the booking, then *completes* the record with the
//! booking id. Later callers observe the completed record and replay it, or
//! see an in-flight reservation and are told to retry.

use std::fmt;

use chrono::TimeDelta;
use sha2::{Digest, Sha256};

use super::{BookingId, KeyHash};

/// Longest accepted idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Lifetime of a completed idempotency record.
pub fn completed_ttl() -> TimeDelta {
    TimeDelta::hours(24)
}

/// Lifetime of a reservation that has not been completed yet.
///
/// A request that dies between reserve and complete frees its key after this.
pub fn reservation_ttl() -> TimeDelta {
    TimeDelta::seconds(60)
}

/// Validation errors for [`IdempotencyKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyKeyValidationError {
    /// The key string was empty.
    EmptyKey,
    /// The key had surrounding whitespace or exceeded the length limit.
    InvalidKey,
}

impl fmt::Display for IdempotencyKeyValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKey => write!(f, "idempotency key must not be empty"),
            Self::InvalidKey => write!(
                f,
                "idempotency key must be at most {MAX_IDEMPOTENCY_KEY_LEN} characters without surrounding whitespace"
            ),
        }
    }
}

impl std::error::Error for IdempotencyKeyValidationError {}

/// Client-provided idempotency key.
///
/// The plaintext never leaves this type except as a [`KeyHash`].
///
/// # Examples
/// ```
/// use ridebook::domain::IdempotencyKey;
///
/// let key = IdempotencyKey::new("checkout-42").expect("valid key");
/// assert_eq!(key.hash(), IdempotencyKey::new("checkout-42").unwrap().hash());
/// assert!(IdempotencyKey::new("").is_err());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Validate and construct a key.
    pub fn new(key: impl Into<String>) -> Result<Self, IdempotencyKeyValidationError> {
        let key = key.into();
        if key.is_empty() {
            return Err(IdempotencyKeyValidationError::EmptyKey);
        }
        if key.trim() != key || key.chars().count() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(IdempotencyKeyValidationError::InvalidKey);
        }
        Ok(Self(key))
    }

    /// Fingerprint stored in place of the key.
    pub fn hash(&self) -> KeyHash {
        KeyHash::of(&self.0)
    }
}

impl fmt::Debug for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IdempotencyKey").field(&self.hash().as_str()).finish()
    }
}

/// SHA-256 hash of a canonicalized request payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PayloadHash([u8; 32]);

/// Validation errors for [`PayloadHash`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadHashError {
    /// The byte slice had an incorrect length.
    InvalidLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        actual: usize,
    },
}

impl fmt::Display for PayloadHashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength { expected, actual } => {
                write!(f, "payload hash must be {expected} bytes, got {actual}")
            }
        }
    }
}

impl std::error::Error for PayloadHashError {}

impl PayloadHash {
    /// Construct a hash from stored bytes.
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, PayloadHashError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| PayloadHashError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Canonicalize a JSON value and hash it.
///
/// Object keys are sorted recursively and the value is serialized compactly,
/// so equivalent payloads hash identically regardless of key order.
///
/// # Examples
/// ```
/// use ridebook::domain::canonicalize_and_hash;
/// use serde_json::json;
///
/// assert_eq!(
///     canonicalize_and_hash(&json!({"b": 2, "a": 1})),
///     canonicalize_and_hash(&json!({"a": 1, "b": 2})),
/// );
/// ```
pub fn canonicalize_and_hash(value: &serde_json::Value) -> PayloadHash {
    let mut hasher = Sha256::new();
    write_canonical(value, &mut hasher);
    PayloadHash(hasher.finalize().into())
}

fn write_canonical(value: &serde_json::Value, hasher: &mut Sha256) {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by_key(|(key, _)| key.as_str());
            hasher.update(b"{");
            for (index, (key, entry)) in entries.into_iter().enumerate() {
                if index > 0 {
                    hasher.update(b",");
                }
                write_canonical(&Value::String(key.clone()), hasher);
                hasher.update(b":");
                write_canonical(entry, hasher);
            }
            hasher.update(b"}");
        }
        Value::Array(items) => {
            hasher.update(b"[");
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    hasher.update(b",");
                }
                write_canonical(item, hasher);
            }
            hasher.update(b"]");
        }
        scalar => hasher.update(scalar.to_string().as_bytes()),
    }
}

/// Outcome of reserving an idempotency key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// The caller owns the key and must create the booking.
    Reserved,
    /// A previous request already created a booking under this key.
    Completed {
        /// Booking created by the original request.
        booking_id: BookingId,
        /// Payload hash recorded by the original request.
        payload_hash: PayloadHash,
    },
    /// Another request holds the reservation and has not finished.
    InFlight,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("", IdempotencyKeyValidationError::EmptyKey)]
    #[case(" padded ", IdempotencyKeyValidationError::InvalidKey)]
    fn rejects_malformed_keys(#[case] raw: &str, #[case] expected: IdempotencyKeyValidationError) {
        assert_eq!(IdempotencyKey::new(raw), Err(expected));
    }

    #[rstest]
    fn rejects_overlong_keys() {
        let raw = "k".repeat(MAX_IDEMPOTENCY_KEY_LEN + 1);
        assert_eq!(
            IdempotencyKey::new(raw),
            Err(IdempotencyKeyValidationError::InvalidKey)
        );
    }

    #[rstest]
    fn debug_output_hides_plaintext() {
        let key = IdempotencyKey::new("super-secret-key").expect("valid key");
        assert!(!format!("{key:?}").contains("super-secret-key"));
    }

    #[rstest]
    fn nested_key_order_does_not_change_hash() {
        let a = json!({"outer": {"y": [1, {"b": true, "a": null}], "x": "s"}});
        let b = json!({"outer": {"x": "s", "y": [1, {"a": null, "b": true}]}});
        assert_eq!(canonicalize_and_hash(&a), canonicalize_and_hash(&b));
    }

    #[rstest]
    fn array_order_changes_hash() {
        assert_ne!(
            canonicalize_and_hash(&json!([1, 2])),
            canonicalize_and_hash(&json!([2, 1]))
        );
    }

    #[rstest]
    fn payload_hash_rejects_wrong_length() {
        assert_eq!(
            PayloadHash::try_from_bytes(&[0_u8; 31]),
            Err(PayloadHashError::InvalidLength {
                expected: 32,
                actual: 31
            })
        );
    }
}

//! Helpers for parsing idempotency headers in HTTP handlers.

use actix_web::http::header::HeaderMap;

use crate::domain::{Error, IdempotencyKey, IdempotencyKeyValidationError, MAX_IDEMPOTENCY_KEY_LEN};

/// HTTP header name for idempotency keys.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Extract the idempotency key from request headers.
pub fn extract_idempotency_key(
    headers: &HeaderMap,
) -> Result<Option<IdempotencyKey>, IdempotencyKeyValidationError> {
    let Some(header_value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let key_str = header_value
        .to_str()
        .map_err(|_| IdempotencyKeyValidationError::InvalidKey)?;

    IdempotencyKey::new(key_str).map(Some)
}

/// Map idempotency key validation errors to domain errors.
pub fn map_idempotency_key_error(err: IdempotencyKeyValidationError) -> Error {
    match err {
        IdempotencyKeyValidationError::EmptyKey => {
            Error::invalid_request("Idempotency-Key header must not be empty")
        }
        IdempotencyKeyValidationError::InvalidKey => Error::invalid_request(format!(
            "Idempotency-Key header must be at most {MAX_IDEMPOTENCY_KEY_LEN} characters without surrounding whitespace"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};
    use rstest::rstest;

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(
            HeaderName::from_static("idempotency-key"),
            HeaderValue::from_str(value).expect("header value"),
        );
        map
    }

    #[rstest]
    fn absent_header_is_none() {
        assert_eq!(extract_idempotency_key(&HeaderMap::new()).map(|k| k.is_some()), Ok(false));
    }

    #[rstest]
    fn present_header_is_parsed() {
        let key = extract_idempotency_key(&headers("checkout-42"))
            .expect("valid")
            .expect("present");
        assert_eq!(key.hash(), IdempotencyKey::new("checkout-42").expect("key").hash());
    }

    #[rstest]
    #[case("", IdempotencyKeyValidationError::EmptyKey)]
    #[case(" padded ", IdempotencyKeyValidationError::InvalidKey)]
    fn bad_headers_are_rejected(#[case] value: &str, #[case] expected: IdempotencyKeyValidationError) {
        assert_eq!(
            extract_idempotency_key(&headers(value)).map(|k| k.is_some()),
            Err(expected)
        );
    }

    #[rstest]
    fn errors_map_to_invalid_request() {
        let err = map_idempotency_key_error(IdempotencyKeyValidationError::EmptyKey);
        assert_eq!(err.code(), crate::domain::ErrorCode::InvalidRequest);
    }
}

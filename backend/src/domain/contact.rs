//! Normalization and validation of rider contact details.

use std::sync::OnceLock;

use regex::Regex;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Minimum length of a normalized phone number, including any leading `+`.
pub const MIN_PHONE_LEN: usize = 7;

/// Trim and lowercase an email address.
///
/// # Examples
/// ```
/// use ridebook::domain::contact::normalize_email;
///
/// assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
/// ```
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Whether `email` has the `local@domain.tld` shape accepted for bookings.
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Keep a leading `+` and the digits of a phone number.
///
/// # Examples
/// ```
/// use ridebook::domain::contact::normalize_phone;
///
/// assert_eq!(normalize_phone(" +1 (555) 010-9999 "), "+15550109999");
/// assert_eq!(normalize_phone("555-0100"), "5550100");
/// ```
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut normalized = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        normalized.push('+');
    }
    normalized.extend(trimmed.chars().filter(char::is_ascii_digit));
    normalized
}

/// Whether a normalized phone number is long enough to be dialable.
pub fn is_valid_phone(normalized: &str) -> bool {
    normalized.len() >= MIN_PHONE_LEN && normalized.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ada@example.com", true)]
    #[case("first.last+tag@sub.example.co", true)]
    #[case("no-at-sign.example.com", false)]
    #[case("ada@example", false)]
    #[case("ada@example.c", false)]
    #[case("", false)]
    fn email_shape(#[case] email: &str, #[case] expected: bool) {
        assert_eq!(is_valid_email(email), expected);
    }

    #[rstest]
    #[case("+1 555 0100", "+15550100", true)]
    #[case("555-01", "55501", false)]
    #[case("+-------", "+", false)]
    fn phone_normalization(#[case] raw: &str, #[case] normalized: &str, #[case] valid: bool) {
        let phone = normalize_phone(raw);
        assert_eq!(phone, normalized);
        assert_eq!(is_valid_phone(&phone), valid);
    }
}

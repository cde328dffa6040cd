//! One-time guest access codes and their scrypt hashing.
//!
//! Stored hashes use the `hex(salt):hex(key)` format. Plaintext codes live
//! only in [`AccessCode`], which wipes its buffer on drop.

use std::sync::OnceLock;

use rand::{Rng, RngCore};
use regex::Regex;
use scrypt::{Params, scrypt};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Number of digits in an access code.
pub const ACCESS_CODE_LEN: usize = 6;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 64;

static CODE_RE: OnceLock<Regex> = OnceLock::new();

fn code_regex() -> &'static Regex {
    CODE_RE.get_or_init(|| {
        Regex::new(r"^\d{6}$")
            .unwrap_or_else(|error| panic!("access code regex failed to compile: {error}"))
    })
}

/// Whether `raw` is a well-formed six digit code.
///
/// # Examples
/// ```
/// use ridebook::domain::is_well_formed_code;
///
/// assert!(is_well_formed_code("004217"));
/// assert!(!is_well_formed_code("4217"));
/// assert!(!is_well_formed_code("12345a"));
/// ```
pub fn is_well_formed_code(raw: &str) -> bool {
    code_regex().is_match(raw)
}

/// Plaintext access code. Zeroized on drop and never logged.
pub struct AccessCode(Zeroizing<String>);

impl AccessCode {
    /// Draw a uniformly random six digit code.
    pub fn generate() -> Self {
        let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
        Self(Zeroizing::new(format!("{value:06}")))
    }

    /// Borrow the digits.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for AccessCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessCode(<redacted>)")
    }
}

/// Errors raised while hashing or checking access codes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessCodeHashError {
    /// Cost parameters were rejected by scrypt.
    #[error("invalid scrypt parameters: {0}")]
    Params(String),
    /// A stored hash did not have the `salt:key` hex shape.
    #[error("malformed stored code hash")]
    Malformed,
    /// Key derivation failed.
    #[error("scrypt derivation failed: {0}")]
    Derivation(String),
}

/// Scrypt hasher for access codes.
#[derive(Debug, Clone)]
pub struct AccessCodeHasher {
    params: Params,
}

impl AccessCodeHasher {
    /// Build a hasher with explicit cost parameters.
    pub fn new(log_n: u8, r: u32, p: u32) -> Result<Self, AccessCodeHashError> {
        let params = Params::new(log_n, r, p, KEY_LEN)
            .map_err(|err| AccessCodeHashError::Params(err.to_string()))?;
        Ok(Self { params })
    }

    /// Production cost: N = 2^14, r = 8, p = 1.
    pub fn standard() -> Self {
        Self {
            params: Params::new(14, 8, 1, KEY_LEN)
                .unwrap_or_else(|error| panic!("standard scrypt parameters are valid: {error}")),
        }
    }

    /// Hash `code` with a fresh random salt.
    pub fn hash(&self, code: &str) -> Result<String, AccessCodeHashError> {
        let mut salt = [0_u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt_hex = hex::encode(salt);
        let key = self.derive(code, &salt_hex)?;
        Ok(format!("{salt_hex}:{}", hex::encode(key.as_slice())))
    }

    /// Check `code` against a stored hash in constant time.
    pub fn verify(&self, stored: &str, code: &str) -> Result<bool, AccessCodeHashError> {
        let (salt_hex, key_hex) = stored
            .split_once(':')
            .ok_or(AccessCodeHashError::Malformed)?;
        let expected = hex::decode(key_hex).map_err(|_| AccessCodeHashError::Malformed)?;
        let derived = self.derive(code, salt_hex)?;
        Ok(derived.as_slice().ct_eq(expected.as_slice()).into())
    }

    fn derive(&self, code: &str, salt: &str) -> Result<Zeroizing<Vec<u8>>, AccessCodeHashError> {
        let mut output = Zeroizing::new(vec![0_u8; KEY_LEN]);
        scrypt(code.as_bytes(), salt.as_bytes(), &self.params, &mut output)
            .map_err(|err| AccessCodeHashError::Derivation(err.to_string()))?;
        Ok(output)
    }
}

impl Default for AccessCodeHasher {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn hasher() -> AccessCodeHasher {
        AccessCodeHasher::new(4, 8, 1).expect("cheap params")
    }

    #[rstest]
    fn generated_codes_are_well_formed() {
        for _ in 0..50 {
            assert!(is_well_formed_code(AccessCode::generate().as_str()));
        }
    }

    #[rstest]
    fn hash_has_salt_and_key(hasher: AccessCodeHasher) {
        let stored = hasher.hash("123456").expect("hash");
        let (salt, key) = stored.split_once(':').expect("separator");
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert_eq!(key.len(), KEY_LEN * 2);
        assert!(!stored.contains("123456"));
    }

    #[rstest]
    fn verify_accepts_only_the_original_code(hasher: AccessCodeHasher) {
        let stored = hasher.hash("042042").expect("hash");
        assert_eq!(hasher.verify(&stored, "042042"), Ok(true));
        assert_eq!(hasher.verify(&stored, "042043"), Ok(false));
    }

    #[rstest]
    fn salts_differ_between_calls(hasher: AccessCodeHasher) {
        let first = hasher.hash("111111").expect("hash");
        let second = hasher.hash("111111").expect("hash");
        assert_ne!(first, second);
    }

    #[rstest]
    #[case("no-separator")]
    #[case("abcd:not-hex")]
    fn malformed_hash_is_reported(hasher: AccessCodeHasher, #[case] stored: &str) {
        assert_eq!(
            hasher.verify(stored, "123456"),
            Err(AccessCodeHashError::Malformed)
        );
    }

    #[rstest]
    fn debug_hides_code() {
        let code = AccessCode::generate();
        assert!(!format!("{code:?}").contains(code.as_str()));
    }
}

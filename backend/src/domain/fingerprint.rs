//! SHA-256 fingerprints for keys that must not be stored in plaintext.

use std::fmt;

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of a caller-supplied key.
///
/// Rate-limit and idempotency keys are persisted and logged only in this
/// form.
///
/// # Examples
/// ```
/// use ridebook::domain::KeyHash;
///
/// let hash = KeyHash::of("ip:203.0.113.9");
/// assert_eq!(hash.as_str().len(), 64);
/// assert_eq!(hash, KeyHash::of("ip:203.0.113.9"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyHash(String);

impl KeyHash {
    /// Hash `raw` into its fingerprint.
    pub fn of(raw: &str) -> Self {
        Self(hex::encode(Sha256::digest(raw.as_bytes())))
    }

    /// Wrap a fingerprint loaded from storage.
    pub fn from_stored(hex_digest: impl Into<String>) -> Self {
        Self(hex_digest.into())
    }

    /// Borrow the hex digest.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_known_vector() {
        assert_eq!(
            KeyHash::of("abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn distinct_inputs_produce_distinct_hashes() {
        assert_ne!(KeyHash::of("ip:1.1.1.1"), KeyHash::of("ip:1.1.1.2"));
    }
}

//! # Content Hasher
//!
//! Stable SHA-256 hashing used for artifact change detection, bind-mount
//! change detection, and logging correlation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// A SHA-256 digest, rendered as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash([u8; 32]);

impl Default for ContentHash {
    fn default() -> Self {
        Self::of_empty()
    }
}

impl ContentHash {
    /// Hash of the empty byte string. Defined so callers can compare
    /// against "no content" without special-casing `Option`.
    #[must_use]
    pub fn of_empty() -> Self {
        Self::of(&[])
    }

    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid content hash: {0}")]
pub struct ParseContentHashError(String);

impl FromStr for ContentHash {
    type Err = ParseContentHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(ParseContentHashError(s.to_string()));
        }
        let mut out = [0u8; 32];
        for (i, chunk) in out.iter_mut().enumerate() {
            let byte_str = s
                .get(i * 2..i * 2 + 2)
                .ok_or_else(|| ParseContentHashError(s.to_string()))?;
            *chunk = u8::from_str_radix(byte_str, 16)
                .map_err(|_| ParseContentHashError(s.to_string()))?;
        }
        Ok(Self(out))
    }
}

impl TryFrom<String> for ContentHash {
    type Error = ParseContentHashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentHash> for String {
    fn from(value: ContentHash) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hash_round_trips() {
        let h = ContentHash::of_empty();
        let s = h.to_string();
        let parsed: ContentHash = s.parse().unwrap();
        assert_eq!(h, parsed);
        assert_eq!(
            s,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn different_content_yields_different_hash() {
        assert_ne!(ContentHash::of(b"a"), ContentHash::of(b"b"));
    }

    #[test]
    fn rejects_malformed_hex() {
        "not-a-hash".parse::<ContentHash>().unwrap_err();
        "ab".parse::<ContentHash>().unwrap_err();
    }
}

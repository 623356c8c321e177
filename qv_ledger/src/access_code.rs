//! Access code verifier.
//!
//! SHA-256 over a domain-separated code. Every committed operation is
//! publicly readable, so a code's plaintext is observable after its first
//! successful use: this is a filter against casual submissions, not a
//! secret.

use std::fmt;

use hex::{FromHex, FromHexError};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

const DOMAIN_PREFIX: &[u8] = b"qv-ledger/access-code/v1\0";

/// One-way digest of an access code. Serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessDigest([u8; 32]);

impl AccessDigest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the exact form `to_hex` produces: 64 lowercase hex digits.
    pub fn from_hex(s: &str) -> Result<Self, FromHexError> {
        if let Some((index, c)) = s.char_indices().find(|(_, c)| c.is_ascii_uppercase()) {
            return Err(FromHexError::InvalidHexCharacter { c, index });
        }
        <[u8; 32]>::from_hex(s).map(Self)
    }
}

impl fmt::Debug for AccessDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessDigest({})", self.to_hex())
    }
}

impl Serialize for AccessDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccessDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AccessDigest::from_hex(&s)
            .map_err(|e| D::Error::custom(format!("invalid access digest {:?}: {}", s, e)))
    }
}

/// Digest an access code.
pub fn hash(code: &str) -> AccessDigest {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_PREFIX);
    hasher.update(code.as_bytes());
    AccessDigest(hasher.finalize().into())
}

/// Does `code` hash to `stored`? Compares every byte regardless of where
/// the first difference is.
pub fn verify(code: &str, stored: &AccessDigest) -> bool {
    let candidate = hash(code);
    candidate
        .0
        .iter()
        .zip(stored.0.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_matching_code() {
        let digest = hash("hackathon-2025");
        assert!(verify("hackathon-2025", &digest));
    }

    #[test]
    fn verify_rejects_other_codes() {
        let digest = hash("hackathon-2025");
        assert!(!verify("hackathon-2024", &digest));
        assert!(!verify("", &digest));
        assert!(!verify("Hackathon-2025", &digest));
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash("abc"), hash("abc"));
        assert_ne!(hash("abc"), hash("abd"));
    }

    #[test]
    fn hex_round_trips_through_serde() {
        let digest = hash("code");
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", digest.to_hex()));
        let back: AccessDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }

    #[test]
    fn from_hex_rejects_malformed_input() {
        assert!(AccessDigest::from_hex("abcd").is_err());
        assert!(AccessDigest::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn from_hex_accepts_only_canonical_form() {
        let digest = hash("code");
        assert_eq!(AccessDigest::from_hex(&digest.to_hex()).unwrap(), digest);
        assert!(AccessDigest::from_hex(&"+f".repeat(32)).is_err());
        assert!(AccessDigest::from_hex(&digest.to_hex().to_uppercase()).is_err());
        assert!(AccessDigest::from_hex(&format!("{}00", digest.to_hex())).is_err());

        let signed = format!("\"{}\"", "+f".repeat(32));
        assert!(serde_json::from_str::<AccessDigest>(&signed).is_err());
    }
}

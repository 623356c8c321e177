//! Canonical hashing.
//!
//! Deterministic serialization + SHA-256. Every map in `LedgerState` is a
//! `BTreeMap`, so serde emits keys in sorted order and struct fields in
//! declaration order; no whitespace, no floats. The ledger version is the
//! first field, binding the hash to the kernel that produced it.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::domain::LedgerState;
use crate::LEDGER_VERSION;

/// Canonical UTF-8 JSON bytes of `state`.
pub fn canonical_serialize(state: &LedgerState) -> Vec<u8> {
    let mut root = Map::new();
    root.insert(
        "ledger_version".to_string(),
        Value::Number(LEDGER_VERSION.into()),
    );
    root.insert(
        "state".to_string(),
        serde_json::to_value(state).expect("canonical_serialize: ledger state is always serializable"),
    );
    serde_json::to_vec(&Value::Object(root))
        .expect("canonical_serialize: JSON serialization failed")
}

/// SHA-256 of the canonical serialization, lowercase hex.
pub fn canonical_hash(state: &LedgerState) -> String {
    sha256_hex(&canonical_serialize(state))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

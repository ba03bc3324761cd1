//! Deterministic value encoding for ledger records.
//!
//! Records are encoded as compact JSON. Every entity is built from structs,
//! vectors and scalars only (no maps), so serde emits fields in declaration
//! order and equal values always encode to identical bytes.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// Encodes a record.
///
/// # Errors
///
/// Returns `CoreError::Codec` if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decodes a record previously produced by [`encode`].
///
/// # Errors
///
/// Returns `CoreError::Codec` if the bytes are corrupt or describe a
/// different type.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

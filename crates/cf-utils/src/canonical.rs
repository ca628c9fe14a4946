//! JCS (RFC 8785) canonical JSON, used wherever two structurally-equal
//! values must serialize to the same bytes regardless of field or map-key
//! order - snapshot reproducibility (Testable Property 6) and the
//! stamping round-trip (Testable Property 8) both depend on this.

use serde::Serialize;

use crate::error::CoreError;

/// Serialize `value` to JCS-canonical JSON bytes.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, CoreError> {
    let json_value = serde_json::to_value(value)?;
    serde_json_canonicalizer::to_vec(&json_value)
        .map_err(|e| CoreError::Configuration(format!("canonicalization failed: {e}")))
}

/// BLAKE3 digest of `value`'s canonical JSON form, hex-encoded. Two values
/// that are structurally equal (same keys and scalars, any map order)
/// always hash identically.
pub fn hash_canonical_json<T: Serialize>(value: &T) -> Result<String, CoreError> {
    let bytes = to_canonical_json(value)?;
    Ok(crate::hashing::hash_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reordered_object_keys_hash_identically() {
        let a = json!({"b": 2, "a": 1, "nested": {"y": true, "x": false}});
        let b = json!({"a": 1, "nested": {"x": false, "y": true}, "b": 2});
        assert_eq!(hash_canonical_json(&a).unwrap(), hash_canonical_json(&b).unwrap());
    }

    #[test]
    fn different_values_hash_differently() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        assert_ne!(hash_canonical_json(&a).unwrap(), hash_canonical_json(&b).unwrap());
    }

    #[test]
    fn canonical_bytes_are_compact_and_key_sorted() {
        let value = json!({"z": 1, "a": 2});
        let bytes = to_canonical_json(&value).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"a":2,"z":1}"#);
    }
}

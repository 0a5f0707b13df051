//! Content-addressed identifiers for deduplication
//!
//! Ids are the MD5 digest (lowercase hex) of the record's canonical JSON form.
//! They exist for downstream dedup bookkeeping only; nothing here enforces
//! uniqueness.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::utils::json::canonical_json;

/// Key under which computed ids are stored in enriched records
pub const ID_KEY: &str = "id";

/// Compute the content id of any serializable record.
///
/// Key order does not affect the result.
pub fn compute_id<T: Serialize + ?Sized>(record: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(record)?;
    Ok(digest(&value))
}

/// Content id of an already-serialized JSON value.
pub fn digest(value: &JsonValue) -> String {
    format!("{:x}", md5::compute(canonical_json(value)))
}

/// Return a copy of `record` with `id` set to the digest of its content.
///
/// Any `id` already present is ignored when hashing, so enriching an enriched
/// record yields the same id.
pub fn assign_id(record: &Map<String, JsonValue>) -> Map<String, JsonValue> {
    assign_key(record.clone(), ID_KEY)
}

/// Set `key` on `record` to the digest of the record without that key.
pub fn assign_key(mut record: Map<String, JsonValue>, key: &str) -> Map<String, JsonValue> {
    record.remove(key);
    let id = digest(&JsonValue::Object(record.clone()));
    record.insert(key.to_string(), JsonValue::String(id));
    record
}

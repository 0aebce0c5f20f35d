//! RFC 7386 JSON merge patch, as the client applies `state` payloads.
//!
//! The server never evaluates patches against live state; this exists so
//! replay tooling and tests can compute what a client ends up holding after
//! a sequence of blocks.

use serde_json::{Map, Value};

pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (key, value) in patch {
            if value.is_null() {
                map.remove(key);
            } else {
                apply_merge_patch(map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Applies `patch` only to keys absent from `target`, matching the
/// client-side `onlyIfMissing` contract.
pub fn apply_if_missing(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (key, value) in patch {
            if !map.contains_key(key) && !value.is_null() {
                map.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn if_missing_keeps_existing_keys() {
        let mut state = json!({"theme": "light"});
        apply_if_missing(&mut state, &json!({"theme": "dark", "lang": "en", "gone": null}));
        assert_eq!(state, json!({"theme": "light", "lang": "en"}));
    }

    #[test]
    fn non_object_patch_replaces_target() {
        let mut state = json!({"a": 1});
        apply_merge_patch(&mut state, &json!([1, 2]));
        assert_eq!(state, json!([1, 2]));
    }
}

//! Renaming between the client-facing identifier (`id`) and the wire name (`key`).
//!
//! Both directions return a new object and leave their input untouched.

use serde_json::Value;
use crate::Item;

pub const ID_FIELD: &str = "id";
pub const KEY_FIELD: &str = "key";

/// Renames `id` to `key` for sending.
pub fn id_to_key(item: &Item) -> Item {
    rename(item, ID_FIELD, KEY_FIELD)
}

/// Renames `key` back to `id` for returning to callers.
pub fn key_to_id(item: &Item) -> Item {
    rename(item, KEY_FIELD, ID_FIELD)
}

fn rename(item: &Item, from: &str, to: &str) -> Item {
    if !item.contains_key(from) {
        return item.clone();
    }
    item.iter()
        .filter(|(k, _)| k.as_str() != to)
        .map(|(k, v)| {
            let name = if k == from { to } else { k.as_str() };
            (name.to_string(), v.clone())
        })
        .collect()
}

/// Deep-merges `patch` into `target`: objects are merged field by field,
/// anything else is replaced.
pub fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (k, v) in patch {
                match target.get_mut(k) {
                    Some(existing) => merge(existing, v),
                    None => {
                        target.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(v: Value) -> Item {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_round_trip() {
        let original = item(json!({ "id": "abc", "name": "Alice", "age": 30 }));
        let wire = id_to_key(&original);
        assert_eq!(wire.get("key"), Some(&json!("abc")));
        assert!(!wire.contains_key("id"));

        let back = key_to_id(&wire);
        assert_eq!(back, original);
        assert!(!back.contains_key("key"));
    }

    #[test]
    fn test_input_not_mutated() {
        let original = item(json!({ "id": "abc" }));
        let _ = id_to_key(&original);
        assert_eq!(original, item(json!({ "id": "abc" })));
    }

    #[test]
    fn test_missing_identifier() {
        let wire = id_to_key(&item(json!({ "name": "Bob" })));
        assert_eq!(wire, item(json!({ "name": "Bob" })));
    }

    #[test]
    fn test_wire_name_kept_without_identifier() {
        let wire = id_to_key(&item(json!({ "key": "k1", "n": 1 })));
        assert_eq!(wire, item(json!({ "key": "k1", "n": 1 })));
    }

    #[test]
    fn test_stale_target_field_dropped() {
        let wire = id_to_key(&item(json!({ "id": "new", "key": "old" })));
        assert_eq!(wire, item(json!({ "key": "new" })));
    }

    #[test]
    fn test_deep_merge() {
        let mut target = json!({ "id": "1", "profile": { "name": "A", "age": 1 }, "tags": ["x"] });
        merge(&mut target, &json!({ "profile": { "age": 2 }, "tags": ["y"] }));
        assert_eq!(target, json!({ "id": "1", "profile": { "name": "A", "age": 2 }, "tags": ["y"] }));
    }
}

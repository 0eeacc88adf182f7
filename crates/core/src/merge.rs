//! Deep merge for JSON configuration documents.

use serde_json::Value;

/// Merge `patch` into `base` in place.
///
/// Objects merge key by key, recursively. Every other value (arrays
/// included) replaces the base value wholesale. A `null` in the patch
/// replaces too, so callers can clear optional settings.
pub fn deep_merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, patch_value),
                    None => {
                        base_map.insert(key, patch_value);
                    }
                }
            }
        }
        (slot, patch_value) => *slot = patch_value,
    }
}

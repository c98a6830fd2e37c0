//! Layered merge of configuration trees
//!
//! The base tree (stage-specific) always wins over the overlay tree (shared
//! defaults). The overlay only contributes keys the base does not define, and
//! nested mappings present on both sides are merged recursively:
//!
//! ```
//! use serde_json::json;
//! use telemetry_context::merge::merged;
//!
//! let base = json!({"a": 1, "b": {"x": 1}});
//! let overlay = json!({"b": {"x": 2, "y": 3}, "c": 4});
//!
//! let result = merged(base.as_object().unwrap(), overlay.as_object().unwrap());
//! assert_eq!(
//!     serde_json::Value::Object(result),
//!     json!({"a": 1, "b": {"x": 1, "y": 3}, "c": 4})
//! );
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tree::{ConfigTree, join_path};

/// An overlay value that was discarded because the base defines the same key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConflict {
    /// Dotted path of the conflicting key
    pub path: String,
    /// Value kept from the base tree
    pub kept: Value,
    /// Value discarded from the overlay tree
    pub discarded: Value,
}

impl std::fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: kept {} (discarded shared value {})",
            self.path, self.kept, self.discarded
        )
    }
}

/// Merge `overlay` into `base` in place.
///
/// - keys only in `overlay` are copied into `base`
/// - keys only in `base` are left untouched
/// - keys in both whose values are both mappings are merged recursively
/// - any other key in both keeps the `base` value, silently
pub fn merge(base: &mut ConfigTree, overlay: &ConfigTree) {
    for (key, overlay_value) in overlay {
        match base.get_mut(key) {
            Some(Value::Object(base_map)) => {
                if let Value::Object(overlay_map) = overlay_value {
                    merge(base_map, overlay_map);
                }
            }
            Some(_) => {}
            None => {
                base.insert(key.clone(), overlay_value.clone());
            }
        }
    }
}

/// Pure variant of [`merge`]: returns a new tree and leaves both inputs alone
pub fn merged(base: &ConfigTree, overlay: &ConfigTree) -> ConfigTree {
    let mut result = base.clone();
    merge(&mut result, overlay);
    result
}

/// Merge like [`merge`], additionally reporting every discarded overlay value.
///
/// The resulting tree is identical to the one [`merge`] produces. Leaves that
/// are equal on both sides are not reported.
pub fn merge_with_conflicts(base: &mut ConfigTree, overlay: &ConfigTree) -> Vec<MergeConflict> {
    let mut conflicts = Vec::new();
    merge_at(base, overlay, "", &mut conflicts);
    conflicts
}

fn merge_at(
    base: &mut ConfigTree,
    overlay: &ConfigTree,
    parent: &str,
    conflicts: &mut Vec<MergeConflict>,
) {
    for (key, overlay_value) in overlay {
        let path = join_path(parent, key);
        match base.get_mut(key) {
            Some(Value::Object(base_map)) if overlay_value.is_object() => {
                if let Value::Object(overlay_map) = overlay_value {
                    merge_at(base_map, overlay_map, &path, conflicts);
                }
            }
            Some(base_value) => {
                if base_value != overlay_value {
                    conflicts.push(MergeConflict {
                        path,
                        kept: base_value.clone(),
                        discarded: overlay_value.clone(),
                    });
                }
            }
            None => {
                base.insert(key.clone(), overlay_value.clone());
            }
        }
    }
}

//! Configuration tree representation

use serde_json::{Map, Value};

/// A recursively nested mapping from string keys to values.
///
/// Values are scalars, sequences of trees or scalars, or nested trees. No
/// schema is enforced at this level; see [`crate::schema`] for the typed view.
pub type ConfigTree = Map<String, Value>;

/// Borrow a value as a tree if it is a mapping
pub fn as_tree(value: &Value) -> Option<&ConfigTree> {
    value.as_object()
}

/// Join a parent path and a key into a dotted path
pub(crate) fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Render a scalar the way it would appear in a process environment.
///
/// Strings are returned verbatim, other scalars use their JSON form.
/// Mappings and sequences render as compact JSON.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_path_omits_leading_dot() {
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a.b", "c"), "a.b.c");
    }

    #[test]
    fn scalar_to_string_keeps_strings_verbatim() {
        assert_eq!(scalar_to_string(&json!("true")), "true");
        assert_eq!(scalar_to_string(&json!(true)), "true");
        assert_eq!(scalar_to_string(&json!(42)), "42");
        assert_eq!(scalar_to_string(&Value::Null), "");
    }

    #[test]
    fn as_tree_only_accepts_objects() {
        assert!(as_tree(&json!({"a": 1})).is_some());
        assert!(as_tree(&json!([1, 2])).is_none());
        assert!(as_tree(&json!("x")).is_none());
    }
}

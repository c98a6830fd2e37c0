//! Attribute-style access to a resolved context
//!
//! `ContextView` lets callers walk the merged tree one key at a time
//! (`view.get("queue")?.get("kinesis_shard_count")`) or by dotted path
//! (`view.path("inbound.services.nlb.syslog.ports.0")`). Sequence elements
//! are addressed by their numeric index and each element is itself a view.
//!
//! A view owns a snapshot of the tree taken at construction; later changes to
//! the source tree are not visible through it. Cloning a view or stepping
//! into a child shares the same snapshot.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::tree::{ConfigTree, join_path, scalar_to_string};
use crate::{Error, Result};

static NULL: Value = Value::Null;

/// Read-only, attribute-traversable view over a configuration tree
#[derive(Debug, Clone)]
pub struct ContextView {
    root: Arc<Value>,
    pointer: String,
    path: String,
}

impl ContextView {
    /// Snapshot a tree
    pub fn new(tree: &ConfigTree) -> Self {
        Self::from_value(Value::Object(tree.clone()))
    }

    /// Snapshot an arbitrary value
    pub fn from_value(value: Value) -> Self {
        Self {
            root: Arc::new(value),
            pointer: String::new(),
            path: String::new(),
        }
    }

    /// The value this view points at
    pub fn value(&self) -> &Value {
        self.root.pointer(&self.pointer).unwrap_or(&NULL)
    }

    /// Dotted path of this view from the root (empty for the root)
    pub fn location(&self) -> &str {
        &self.path
    }

    /// Step into a mapping key, or a sequence index given as a number
    pub fn get(&self, key: &str) -> Option<ContextView> {
        let exists = match self.value() {
            Value::Object(map) => map.contains_key(key),
            Value::Array(items) => key.parse::<usize>().is_ok_and(|i| i < items.len()),
            _ => false,
        };
        exists.then(|| self.child(key))
    }

    /// Step into a sequence element
    pub fn index(&self, index: usize) -> Option<ContextView> {
        match self.value() {
            Value::Array(items) if index < items.len() => Some(self.child(&index.to_string())),
            _ => None,
        }
    }

    /// Follow a dotted path such as `outbound.services.pull.processor.size.ram`
    pub fn path(&self, dotted: &str) -> Option<ContextView> {
        dotted
            .split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.clone(), |view, segment| view.get(segment))
    }

    /// Follow a dotted path, failing with [`Error::MissingField`] if absent
    pub fn require(&self, dotted: &str) -> Result<ContextView> {
        self.path(dotted).ok_or_else(|| Error::MissingField {
            path: join_path(&self.path, dotted),
        })
    }

    /// Keys of a mapping in document order; empty for anything else
    pub fn keys(&self) -> Vec<String> {
        match self.value() {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Key/view pairs of a mapping in document order
    pub fn items(&self) -> Vec<(String, ContextView)> {
        self.keys()
            .into_iter()
            .map(|key| {
                let view = self.child(&key);
                (key, view)
            })
            .collect()
    }

    /// Element views of a sequence; empty for anything else
    pub fn elements(&self) -> Vec<ContextView> {
        match self.value() {
            Value::Array(items) => (0..items.len())
                .map(|i| self.child(&i.to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_mapping(&self) -> bool {
        self.value().is_object()
    }

    pub fn is_sequence(&self) -> bool {
        self.value().is_array()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value().as_str()
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.value().as_u64()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value().as_i64()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value().as_f64()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value().as_bool()
    }

    /// Owned copy of the value this view points at
    pub fn to_value(&self) -> Value {
        self.value().clone()
    }

    fn child(&self, key: &str) -> ContextView {
        ContextView {
            root: Arc::clone(&self.root),
            pointer: format!("{}/{}", self.pointer, escape_pointer(key)),
            path: join_path(&self.path, key),
        }
    }
}

impl fmt::Display for ContextView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Value::Object(_) | Value::Array(_) => write!(f, "{}", self.value()),
            scalar => write!(f, "{}", scalar_to_string(scalar)),
        }
    }
}

impl PartialEq for ContextView {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

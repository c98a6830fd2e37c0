//! Deployment context store
//!
//! The store holds the raw key/value context supplied by the deployment tool:
//! the `context` member of a context document (`cdk.json` and friends) plus
//! `KEY=VALUE` overrides given on the command line. Overrides win over keys
//! from the document.

use std::path::Path;

use serde_json::Value;

use crate::tree::ConfigTree;
use crate::{Error, Result};

/// Name of the member holding context values inside a context document
const CONTEXT_MEMBER: &str = "context";

/// Raw deployment context key/value store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextStore {
    values: ConfigTree,
}

impl ContextStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from an in-memory tree
    pub fn from_tree(values: ConfigTree) -> Self {
        Self { values }
    }

    /// Create a store from a parsed context document.
    ///
    /// A document with a top-level `context` mapping contributes only that
    /// mapping; any other mapping is used as the context itself.
    pub fn from_document(document: Value) -> Result<Self> {
        match document {
            Value::Object(mut map) => {
                if let Some(Value::Object(context)) = map.remove(CONTEXT_MEMBER) {
                    Ok(Self::from_tree(context))
                } else {
                    Ok(Self::from_tree(map))
                }
            }
            other => Err(Error::Schema {
                path: String::new(),
                message: format!("context document must be a mapping, got {}", type_name(&other)),
            }),
        }
    }

    /// Load a context document from disk.
    ///
    /// Format is detected from file extension:
    /// - `.json` -> JSON
    /// - `.toml` -> TOML
    /// - `.yaml`, `.yml` -> YAML
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let document: Value = match extension.to_lowercase().as_str() {
            "json" => serde_json::from_str(&content).map_err(|e| Error::ContextParse {
                path: path.to_path_buf(),
                format: "JSON".into(),
                message: e.to_string(),
            })?,
            "toml" => toml::from_str(&content).map_err(|e| Error::ContextParse {
                path: path.to_path_buf(),
                format: "TOML".into(),
                message: e.to_string(),
            })?,
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| Error::ContextParse {
                path: path.to_path_buf(),
                format: "YAML".into(),
                message: e.to_string(),
            })?,
            _ => {
                return Err(Error::UnsupportedFormat {
                    extension: extension.to_string(),
                });
            }
        };

        tracing::debug!(?path, "Loaded context document");
        Self::from_document(document)
    }

    /// Apply a single `KEY=VALUE` override.
    ///
    /// Values are stored as strings, matching how the deployment tool passes
    /// command-line context. The key is split at the first `=`.
    pub fn apply_override(&mut self, raw: &str) -> Result<()> {
        let (key, value) = raw
            .split_once('=')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| Error::InvalidOverride {
                raw: raw.to_string(),
            })?;

        tracing::debug!(key = key.trim(), "Applying context override");
        self.values
            .insert(key.trim().to_string(), Value::String(value.to_string()));
        Ok(())
    }

    /// Apply a list of `KEY=VALUE` overrides in order
    pub fn with_overrides<I, S>(mut self, overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in overrides {
            self.apply_override(raw.as_ref())?;
        }
        Ok(self)
    }

    /// Look up a context value, returning `None` when absent or null
    pub fn try_get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|value| !value.is_null())
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

//! Error types for telemetry-context

use std::path::PathBuf;

/// Result type for telemetry-context operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or resolving a deployment context
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A mandatory selector (e.g. the stage name) is absent from the store
    #[error("Selector '{selector}' not found; set with --context {selector}=<value>")]
    MissingSelector { selector: String },

    /// A selector is present but has an unusable value
    #[error("Invalid value for selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// A configuration branch selected by name is absent or not a mapping
    #[error("Context branch '{name}' not found or not a mapping")]
    MissingBranch { name: String },

    /// A required field is absent from the resolved context
    #[error("Missing required field: {path}")]
    MissingField { path: String },

    /// The resolved context does not match the typed schema
    #[error("Invalid context at '{path}': {message}")]
    Schema { path: String, message: String },

    /// A command-line override is not of the form KEY=VALUE
    #[error("Invalid context override '{raw}': expected KEY=VALUE")]
    InvalidOverride { raw: String },

    /// The context document could not be parsed
    #[error("Failed to parse {format} context at {path}: {message}")]
    ContextParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    /// The context document has an unknown extension
    #[error("Unsupported context format: {extension}")]
    UnsupportedFormat { extension: String },

    /// I/O error reading a context document
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn missing_selector(selector: impl Into<String>) -> Self {
        Self::MissingSelector {
            selector: selector.into(),
        }
    }
}

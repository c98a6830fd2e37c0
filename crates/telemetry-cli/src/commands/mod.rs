//! Command implementations for telemetry-cli

pub mod check;
pub mod get;
pub mod plan;
pub mod resolve;
pub mod stacks;

use std::path::PathBuf;

use telemetry_context::{ContextResolver, ContextStore, ResolvedContext};

use crate::error::Result;

pub use check::run_check;
pub use get::run_get;
pub use plan::run_plan;
pub use resolve::run_resolve;
pub use stacks::run_stacks;

/// Where the context comes from: a document plus command-line overrides
#[derive(Debug, Clone)]
pub struct ContextSource {
    file: PathBuf,
    overrides: Vec<String>,
}

impl ContextSource {
    pub fn new(file: impl Into<PathBuf>, overrides: Vec<String>) -> Self {
        Self {
            file: file.into(),
            overrides,
        }
    }

    /// Load the document, apply overrides and resolve the selected stage
    pub fn resolve(&self) -> Result<ResolvedContext> {
        let store = ContextStore::load(&self.file)?.with_overrides(&self.overrides)?;
        let resolved = ContextResolver::new().resolve(&store)?;
        tracing::debug!(
            file = %self.file.display(),
            stage = resolved.stage(),
            "Resolved context"
        );
        Ok(resolved)
    }
}

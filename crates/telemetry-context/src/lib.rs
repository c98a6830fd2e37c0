//! Deployment context resolution for the telemetry pipeline
//!
//! The deployment context is a two-level configuration tree: a `shared`
//! branch of defaults and one branch per stage. This crate provides:
//!
//! - **Context store**: raw key/value context from a context document plus
//!   `KEY=VALUE` overrides
//! - **Merge**: stage-over-shared deep merge where the stage always wins
//! - **Resolution**: stage selection, desired-count defaulting, merge
//! - **View**: attribute-style, read-only traversal of the merged tree
//! - **Schema**: the typed [`AppContext`] and its consistency checks
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use telemetry_context::{ContextResolver, ContextStore};
//!
//! let store = ContextStore::from_document(json!({
//!     "context": {
//!         "shared": {"aws_region": "eu-west-1", "queue": {"kinesis_shard_count": 1}},
//!         "prod": {"queue": {"kinesis_shard_count": 8}}
//!     }
//! }))?
//! .with_overrides(["stage=prod"])?;
//!
//! let resolved = ContextResolver::new().resolve(&store)?;
//! let view = resolved.view();
//! assert_eq!(view.path("queue.kinesis_shard_count").and_then(|v| v.as_u64()), Some(8));
//! assert_eq!(view.path("aws_region").and_then(|v| v.as_str().map(String::from)), Some("eu-west-1".into()));
//! assert_eq!(resolved.default_desired_count(), 1);
//! # Ok::<(), telemetry_context::Error>(())
//! ```

pub mod error;
pub mod merge;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod tree;
pub mod validate;
pub mod view;

pub use error::{Error, Result};
pub use merge::{MergeConflict, merge, merge_with_conflicts, merged};
pub use resolver::{
    ContextResolver, DEFAULT_DESIRED_COUNT, DESIRED_COUNT_KEY, ResolvedContext, ResolverOptions,
    STAGE_KEY,
};
pub use schema::{
    AppContext, InboundConfig, InboundServices, NamespaceProps, OutboundConfig,
    PROCESSOR_SERVICE, QueueConfig, ScalingConfig, ServiceConfig, ServiceKind, TaskSize,
    VpcProps,
};
pub use store::ContextStore;
pub use tree::ConfigTree;
pub use validate::{Severity, ValidationIssue, has_errors};
pub use view::ContextView;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_selector_display_mentions_override_syntax() {
        let error = Error::missing_selector("stage");
        let display = error.to_string();
        assert!(
            display.contains("--context stage="),
            "Error display should explain how to set the stage, got: {}",
            display
        );
    }
}

//! Context resolution with stage selection
//!
//! The `ContextResolver` picks the stage branch named by the `stage` selector,
//! merges it over the `shared` branch and records the selector values in the
//! result.

use serde::Serialize;
use serde_json::Value;

use crate::merge::{MergeConflict, merge_with_conflicts};
use crate::schema::AppContext;
use crate::store::{ContextStore, type_name};
use crate::tree::ConfigTree;
use crate::view::ContextView;
use crate::{Error, Result};

/// Desired task count used when the store does not supply one
pub const DEFAULT_DESIRED_COUNT: u64 = 1;

/// Top-level key of the merged tree holding the selected stage
pub const STAGE_KEY: &str = "stage";

/// Top-level key of the merged tree holding the default desired count
pub const DESIRED_COUNT_KEY: &str = "default_desired_count";

/// Selector and branch names used by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Mandatory selector naming the stage branch
    pub stage_selector: String,
    /// Optional selector for the default desired task count
    pub desired_count_selector: String,
    /// Branch holding defaults shared by all stages
    pub shared_branch: String,
    /// Fallback when `desired_count_selector` is absent
    pub default_desired_count: u64,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            stage_selector: "stage".to_string(),
            desired_count_selector: "desired_count".to_string(),
            shared_branch: "shared".to_string(),
            default_desired_count: DEFAULT_DESIRED_COUNT,
        }
    }
}

/// The effective context after merging a stage branch over shared defaults
///
/// Read-only once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedContext {
    stage: String,
    default_desired_count: u64,
    tree: ConfigTree,
    #[serde(skip)]
    conflicts: Vec<MergeConflict>,
}

impl ResolvedContext {
    /// The selected stage name
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// The desired count applied to services that do not set their own
    pub fn default_desired_count(&self) -> u64 {
        self.default_desired_count
    }

    /// The merged tree, including the `stage` and `default_desired_count` keys
    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    /// Shared values that were discarded in favour of stage values
    pub fn conflicts(&self) -> &[MergeConflict] {
        &self.conflicts
    }

    /// Attribute-style view over a snapshot of the merged tree
    pub fn view(&self) -> ContextView {
        ContextView::new(&self.tree)
    }

    /// Parse the merged tree into the typed schema
    pub fn to_app_context(&self) -> Result<AppContext> {
        AppContext::from_tree(&self.tree)
    }

    /// The merged tree as a JSON value
    pub fn to_value(&self) -> Value {
        Value::Object(self.tree.clone())
    }
}

/// Resolves the effective context from a [`ContextStore`]
#[derive(Debug, Clone, Default)]
pub struct ContextResolver {
    options: ResolverOptions,
}

impl ContextResolver {
    /// Create a resolver with the default selector names
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with custom selector names
    pub fn with_options(options: ResolverOptions) -> Self {
        Self { options }
    }

    /// Resolve the context for the stage named in `store`
    ///
    /// # Errors
    ///
    /// - [`Error::MissingSelector`] when the stage selector is absent
    /// - [`Error::InvalidSelector`] when a selector has an unusable value
    /// - [`Error::MissingBranch`] when the stage or shared branch is absent
    ///   or not a mapping
    pub fn resolve(&self, store: &ContextStore) -> Result<ResolvedContext> {
        let stage = self.stage(store)?;
        let desired_count = self.desired_count(store)?;

        let stage_branch = self.branch(store, &stage)?;
        let shared_branch = self.branch(store, &self.options.shared_branch)?;

        let mut tree = stage_branch.clone();
        let conflicts = merge_with_conflicts(&mut tree, shared_branch);
        for conflict in &conflicts {
            tracing::debug!(%conflict, "Shared value overridden by stage");
        }

        tree.insert(STAGE_KEY.to_string(), Value::String(stage.clone()));
        tree.insert(DESIRED_COUNT_KEY.to_string(), Value::from(desired_count));

        tracing::debug!(
            stage = %stage,
            desired_count,
            keys = tree.len(),
            conflicts = conflicts.len(),
            "Resolved deployment context"
        );

        Ok(ResolvedContext {
            stage,
            default_desired_count: desired_count,
            tree,
            conflicts,
        })
    }

    /// Resolve, logging any failure and returning `None` instead of an error.
    ///
    /// Callers must treat `None` as a fatal startup condition.
    pub fn try_resolve(&self, store: &ContextStore) -> Option<ResolvedContext> {
        match self.resolve(store) {
            Ok(resolved) => Some(resolved),
            Err(error) => {
                tracing::error!(%error, "Failed to resolve deployment context");
                None
            }
        }
    }

    /// The stage name, used verbatim as the branch key
    fn stage(&self, store: &ContextStore) -> Result<String> {
        let selector = &self.options.stage_selector;
        match store.try_get(selector) {
            None => Err(Error::missing_selector(selector.as_str())),
            Some(Value::String(stage)) if !stage.is_empty() => Ok(stage.clone()),
            Some(Value::String(_)) => Err(Error::InvalidSelector {
                selector: selector.clone(),
                message: "stage name is empty".to_string(),
            }),
            Some(other) => Err(Error::InvalidSelector {
                selector: selector.clone(),
                message: format!("expected a string, got {}", type_name(other)),
            }),
        }
    }

    fn desired_count(&self, store: &ContextStore) -> Result<u64> {
        let selector = &self.options.desired_count_selector;
        let invalid = |message: String| Error::InvalidSelector {
            selector: selector.clone(),
            message,
        };

        match store.try_get(selector) {
            None => {
                tracing::debug!(
                    default = self.options.default_desired_count,
                    "No desired count selector; using default"
                );
                Ok(self.options.default_desired_count)
            }
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| invalid(format!("expected a non-negative integer, got {}", n))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| invalid(format!("expected a non-negative integer, got '{}'", s))),
            Some(other) => Err(invalid(format!(
                "expected a non-negative integer, got {}",
                type_name(other)
            ))),
        }
    }

    fn branch<'a>(&self, store: &'a ContextStore, name: &str) -> Result<&'a ConfigTree> {
        store
            .try_get(name)
            .and_then(Value::as_object)
            .ok_or_else(|| Error::MissingBranch {
                name: name.to_string(),
            })
    }
}

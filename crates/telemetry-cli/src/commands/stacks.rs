//! Stacks command implementation

use telemetry_plan::StackRole;

use super::ContextSource;
use crate::error::Result;

/// Run the stacks command.
///
/// Only the stage is needed, so the rest of the context is not validated.
pub fn run_stacks(source: &ContextSource) -> Result<()> {
    let resolved = source.resolve()?;
    for id in stack_ids(resolved.stage()) {
        println!("{}", id);
    }
    Ok(())
}

pub fn stack_ids(stage: &str) -> Vec<String> {
    StackRole::ALL
        .iter()
        .map(|role| role.stack_id(stage))
        .collect()
}

//! Get command implementation

use telemetry_context::ContextView;

use super::ContextSource;
use crate::error::Result;

/// Run the get command
pub fn run_get(source: &ContextSource, path: &str, json: bool) -> Result<()> {
    let resolved = source.resolve()?;
    let value = resolved.view().require(path)?;
    println!("{}", render(&value, json)?);
    Ok(())
}

/// Scalars print bare; mappings, sequences and `--json` print as pretty JSON
pub fn render(value: &ContextView, json: bool) -> Result<String> {
    if json || value.is_mapping() || value.is_sequence() {
        Ok(serde_json::to_string_pretty(value.value())?)
    } else {
        Ok(value.to_string())
    }
}

//! Resolve command implementation

use telemetry_context::ResolvedContext;

use super::ContextSource;
use crate::error::Result;

/// Run the resolve command
pub fn run_resolve(source: &ContextSource, json: bool) -> Result<()> {
    let resolved = source.resolve()?;
    print!("{}", render(&resolved, json)?);
    Ok(())
}

/// Merged context as pretty JSON or YAML
pub fn render(resolved: &ResolvedContext, json: bool) -> Result<String> {
    let value = resolved.to_value();
    if json {
        Ok(format!("{}\n", serde_json::to_string_pretty(&value)?))
    } else {
        Ok(serde_yaml::to_string(&value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use telemetry_context::{ContextResolver, ContextStore};

    fn resolved() -> ResolvedContext {
        let store = ContextStore::from_document(json!({
            "context": {
                "stage": "dev",
                "shared": {"aws_region": "eu-west-1", "queue": {"kinesis_shard_count": 1}},
                "dev": {"queue": {"kinesis_shard_count": 2}}
            }
        }))
        .unwrap();
        ContextResolver::new().resolve(&store).unwrap()
    }

    #[test]
    fn renders_yaml_by_default() {
        insta::assert_snapshot!(render(&resolved(), false).unwrap(), @r"
        queue:
          kinesis_shard_count: 2
        aws_region: eu-west-1
        stage: dev
        default_desired_count: 1
        ");
    }

    #[test]
    fn renders_json_on_request() {
        let output = render(&resolved(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["queue"]["kinesis_shard_count"], 2);
        assert_eq!(value["default_desired_count"], 1);
    }
}

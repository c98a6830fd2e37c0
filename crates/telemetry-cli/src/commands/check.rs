//! Check command implementation

use colored::Colorize;
use serde::Serialize;
use telemetry_context::{MergeConflict, ResolvedContext, Severity, ValidationIssue};

use super::ContextSource;
use crate::error::{CliError, Result};

/// Findings for one resolved stage
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub stage: String,
    pub conflicts: Vec<MergeConflict>,
    pub issues: Vec<ValidationIssue>,
}

impl CheckReport {
    pub fn new(resolved: &ResolvedContext) -> Result<Self> {
        let ctx = resolved.to_app_context()?;
        Ok(Self {
            stage: resolved.stage().to_string(),
            conflicts: resolved.conflicts().to_vec(),
            issues: ctx.validate(),
        })
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.level == Severity::Error)
            .count()
    }

    /// Human-readable listing
    pub fn render(&self) -> String {
        let mut lines = vec![format!("{} {}", "Context check for stage".bold(), self.stage.cyan())];

        if !self.conflicts.is_empty() {
            lines.push(String::new());
            lines.push(format!("{}:", "Overridden shared values".bold()));
            for conflict in &self.conflicts {
                lines.push(format!("  {} {}", "~".yellow(), conflict));
            }
        }

        if !self.issues.is_empty() {
            lines.push(String::new());
            lines.push(format!("{}:", "Issues".bold()));
            for issue in &self.issues {
                let level = match issue.level {
                    Severity::Error => issue.level.to_string().red(),
                    Severity::Warning => issue.level.to_string().yellow(),
                    Severity::Info => issue.level.to_string().dimmed(),
                };
                lines.push(format!("  {} {}: {}", level, issue.path, issue.message));
            }
        }

        lines.push(String::new());
        match self.error_count() {
            0 => lines.push("Context is deployable".green().to_string()),
            n => lines.push(format!("{} error(s) found", n).red().to_string()),
        }
        lines.join("\n")
    }
}

/// Run the check command.
///
/// Fails when any error-level issue is found, after printing the report.
pub fn run_check(source: &ContextSource, json: bool) -> Result<()> {
    let resolved = source.resolve()?;
    let report = CheckReport::new(&resolved)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.render());
    }

    match report.error_count() {
        0 => Ok(()),
        n => Err(CliError::user(format!(
            "context for stage '{}' has {} error(s)",
            report.stage, n
        ))),
    }
}

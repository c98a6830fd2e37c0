//! Plan command implementation

use colored::Colorize;
use telemetry_plan::{PipelinePlan, StackBody};

use super::ContextSource;
use crate::error::Result;

/// Run the plan command
pub fn run_plan(source: &ContextSource, json: bool) -> Result<()> {
    let resolved = source.resolve()?;
    let plan = PipelinePlan::build(&resolved.to_app_context()?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("{}", render(&plan)?);
    }
    Ok(())
}

/// Stack-by-stack summary followed by the plan fingerprint
pub fn render(plan: &PipelinePlan) -> Result<String> {
    let mut lines = vec![format!(
        "{} {} ({} / {})",
        "Deployment plan for stage".bold(),
        plan.stage.cyan(),
        plan.environment.account,
        plan.environment.region
    )];

    for stack in &plan.stacks {
        lines.push(String::new());
        lines.push(format!("{} {}", stack.id.bold(), stack.description.dimmed()));
        match &stack.body {
            StackBody::Queue(queue) => {
                lines.push(format!(
                    "  {} stream {} ({} shard(s)), table {}",
                    "+".green(),
                    queue.stream.id,
                    queue.stream.shard_count,
                    queue.state_table.id
                ));
            }
            StackBody::Repository(repository) => {
                lines.push(format!("  {} repository {}", "+".green(), repository.id));
            }
            StackBody::Services(body) => {
                if let Some(nlb) = &body.load_balancer {
                    lines.push(format!("  {} load balancer {}", "+".green(), nlb.id));
                }
                for service in &body.services {
                    lines.push(format!(
                        "  {} {} [{}] cpu={} memory={}MiB desired={}",
                        "+".green(),
                        service.name.cyan(),
                        service.kind,
                        service.cpu,
                        service.memory_mib,
                        service.desired_count
                    ));
                }
            }
        }
        for output in &stack.outputs {
            lines.push(format!("  {} {} = {}", "->".dimmed(), output.export_name, output.value));
        }
    }

    lines.push(String::new());
    lines.push(format!("{}: {}", "Fingerprint".dimmed(), plan.fingerprint()?));
    Ok(lines.join("\n"))
}

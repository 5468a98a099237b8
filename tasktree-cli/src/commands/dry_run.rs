//! `tt --dry-run <task>` - the execution plan, without running anything.

use super::{CliError, load_project};
use std::path::Path;
use tasktree_engine::{ValidatorRegistry, bind_all, plan};

pub fn execute(file: Option<&Path>, target: &str, tokens: &[String]) -> Result<(), CliError> {
    let project = load_project(file)?;

    let registry = ValidatorRegistry::new();
    let order = project.graph.reachable_order(target)?;
    let args = bind_all(&project.graph, &order, target, tokens, &registry)?;
    let plan = plan(&project.graph, &project.state, target, &args)?;

    let stale = plan.to_run().count();
    println!(
        "plan for {target}: {stale} to run, {} fresh",
        plan.order.len() - stale
    );

    let mut step = 0;
    for name in &plan.order {
        let Some(status) = plan.status(name) else {
            continue;
        };
        if status.will_run {
            step += 1;
            if status.changed_files.is_empty() {
                println!("  {step}. {name}  ({})", status.reason);
            } else {
                println!(
                    "  {step}. {name}  ({}: {})",
                    status.reason,
                    status.changed_files.join(", ")
                );
            }
        } else {
            println!("     {name}  (fresh)");
        }
    }
    Ok(())
}

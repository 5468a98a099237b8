//! `tt --tree <task>` - the dependency tree, annotated with freshness.

use super::{CliError, load_project};
use std::path::Path;
use tasktree_engine::{Plan, ValidatorRegistry, bind_all, plan};
use tasktree_graph::TaskGraph;

pub fn execute(file: Option<&Path>, target: &str, tokens: &[String]) -> Result<(), CliError> {
    let project = load_project(file)?;

    let registry = ValidatorRegistry::new();
    let order = project.graph.reachable_order(target)?;
    let args = bind_all(&project.graph, &order, target, tokens, &registry)?;
    let plan = plan(&project.graph, &project.state, target, &args)?;

    println!("{target} {}", annotation(&plan, target));
    let task = project.graph.task(target)?;
    print_children(&project.graph, &plan, &task.dependencies, "");
    Ok(())
}

fn annotation(plan: &Plan, name: &str) -> String {
    match plan.status(name) {
        Some(status) if status.will_run => format!("[stale: {}]", status.reason),
        Some(_) => "[fresh]".to_string(),
        None => String::new(),
    }
}

fn print_children(graph: &TaskGraph, plan: &Plan, deps: &[String], prefix: &str) {
    for (index, name) in deps.iter().enumerate() {
        let last = index + 1 == deps.len();
        let connector = if last { "└── " } else { "├── " };
        println!("{prefix}{connector}{name} {}", annotation(plan, name));

        if let Ok(task) = graph.task(name) {
            let child_prefix = if last {
                format!("{prefix}    ")
            } else {
                format!("{prefix}│   ")
            };
            print_children(graph, plan, &task.dependencies, &child_prefix);
        }
    }
}

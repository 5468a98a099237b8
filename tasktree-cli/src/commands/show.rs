//! `tt --show <task>` - the normalised definition, post-import-resolution.

use super::{CliError, load_project};
use std::path::Path;
use tasktree_engine::task_fingerprint;

pub fn execute(file: Option<&Path>, target: &str) -> Result<(), CliError> {
    let project = load_project(file)?;
    let task = project.graph.task(target)?;

    println!("task:     {}", task.qualified_name);
    if let Some(description) = &task.description {
        println!("desc:     {description}");
    }
    println!("dir:      {}", task.working_dir.display());
    println!("hash:     {}", task_fingerprint(task));

    if !task.dependencies.is_empty() {
        println!("deps:     {}", task.dependencies.join(", "));
    }
    if !task.explicit_inputs.is_empty() {
        println!("inputs:   {}", task.explicit_inputs.join(", "));
    }
    if !task.outputs.is_empty() {
        println!("outputs:  {}", task.outputs.join(", "));
    }
    if !task.parameters.is_empty() {
        let rendered: Vec<String> = task
            .parameters
            .iter()
            .map(|param| match &param.default {
                Some(default) => format!("{}:{}={default}", param.name, param.ty),
                None => format!("{}:{}", param.name, param.ty),
            })
            .collect();
        println!("args:     {}", rendered.join(", "));
    }

    println!("cmd:");
    for line in task.command.lines() {
        println!("  {line}");
    }
    Ok(())
}

//! `tt --list` - one line per task.

use super::{CliError, load_project};
use std::path::Path;

pub fn execute(file: Option<&Path>) -> Result<(), CliError> {
    let project = load_project(file)?;

    if project.graph.is_empty() {
        println!("no tasks defined");
        return Ok(());
    }

    let width = project
        .graph
        .tasks()
        .map(|task| task.qualified_name.len())
        .max()
        .unwrap_or(0);

    for task in project.graph.tasks() {
        match &task.description {
            Some(description) => {
                println!("{:<width$}  {description}", task.qualified_name)
            }
            None => println!("{}", task.qualified_name),
        }
    }
    Ok(())
}

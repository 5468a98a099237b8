//! `tt <task> [args...]` - execute a task and everything stale beneath it.

use super::{CliError, load_project};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tasktree_engine::{Executor, SystemShell, ValidatorRegistry, bind_all, plan};

pub fn execute(file: Option<&Path>, target: &str, tokens: &[String]) -> Result<(), CliError> {
    let mut project = load_project(file)?;

    let registry = ValidatorRegistry::new();
    let order = project.graph.reachable_order(target)?;
    let args = bind_all(&project.graph, &order, target, tokens, &registry)?;
    let plan = plan(&project.graph, &project.state, target, &args)?;

    let stale: Vec<&str> = plan.to_run().collect();
    if stale.is_empty() {
        println!("✓ {target} is up to date");
        return Ok(());
    }

    for name in &stale {
        if let Some(status) = plan.status(name) {
            println!("→ {name} ({})", status.reason);
        }
    }

    // The child process shares the terminal's foreground process group and
    // receives the interrupt itself; the flag only stops further tasks.
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    let _ = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst));

    let executor = Executor::new(&project.graph, SystemShell, project.state_path.clone())
        .with_interrupt(interrupted);
    let summary = executor.run(&plan, &args, &mut project.state)?;

    println!(
        "✓ {} task(s) run, {} fresh",
        summary.executed.len(),
        summary.skipped
    );
    Ok(())
}

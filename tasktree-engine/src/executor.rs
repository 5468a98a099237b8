//! Sequential task execution with per-task state persistence.
//!
//! Runs exactly the tasks the plan marked stale, dependencies first. After
//! each success the whole state file is persisted atomically, so a later
//! failure or interrupt keeps every earlier result durable. Failure never
//! touches the failing task's entry.

use crate::analyze;
use crate::state::{State, StateEntry, StateError};
use crate::status::Plan;
use crate::value::ArgValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tasktree_graph::TaskGraph;
use tracing::{debug, info};

/// Execution error types.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Child exited non-zero
    #[error("task `{task}` failed with exit code {code}")]
    TaskFailed {
        /// The failing task
        task: String,
        /// Its exit code
        code: i32,
    },

    /// Shell could not be spawned
    #[error("task `{task}`: failed to run shell: {message}")]
    Spawn {
        /// The task being started
        task: String,
        /// Underlying failure
        message: String,
    },

    /// Working directory missing at execution time
    #[error("task `{task}`: working directory {dir} does not exist")]
    MissingWorkingDir {
        /// The task that could not start
        task: String,
        /// Its declared working directory
        dir: PathBuf,
    },

    /// Cancelled by signal
    #[error("interrupted")]
    Interrupted,

    /// State persistence failure
    #[error(transparent)]
    State(#[from] StateError),
}

/// How commands reach the platform shell. This is the seam reserved for
/// container or remote backends; the engine only ever calls through it.
pub trait ShellBackend {
    /// Run `command` with the given working directory, inheriting the
    /// process environment, blocking until exit.
    fn run(&self, command: &str, working_dir: &Path) -> std::io::Result<ExitStatus>;
}

/// The platform shell: `sh -c` on Unix, `cmd /C` on Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

impl ShellBackend for SystemShell {
    fn run(&self, command: &str, working_dir: &Path) -> std::io::Result<ExitStatus> {
        #[cfg(unix)]
        let mut shell = {
            let mut shell = Command::new("sh");
            let _ = shell.arg("-c").arg(command);
            shell
        };
        #[cfg(windows)]
        let mut shell = {
            let mut shell = Command::new("cmd");
            let _ = shell.arg("/C").arg(command);
            shell
        };

        shell.current_dir(working_dir).status()
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Tasks executed, in execution order
    pub executed: Vec<String>,
    /// Tasks skipped as fresh
    pub skipped: usize,
}

/// Executes the stale portion of a plan in topological order.
pub struct Executor<'a, S: ShellBackend> {
    graph: &'a TaskGraph,
    shell: S,
    state_path: PathBuf,
    interrupt: Option<Arc<AtomicBool>>,
}

impl<'a, S: ShellBackend> Executor<'a, S> {
    /// New executor persisting state to `state_path`.
    pub fn new(graph: &'a TaskGraph, shell: S, state_path: PathBuf) -> Self {
        Self {
            graph,
            shell,
            state_path,
            interrupt: None,
        }
    }

    /// Install a cancellation flag, checked before each task and after each
    /// child exits. The child itself receives the terminal's interrupt
    /// directly through the shared foreground process group.
    #[must_use]
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Run every task the plan marked stale.
    ///
    /// On success the updated entries are already durable; on failure or
    /// interrupt, entries of tasks that completed earlier are durable and
    /// nothing was recorded for the rest.
    pub fn run(
        &self,
        plan: &Plan,
        args: &BTreeMap<String, Vec<ArgValue>>,
        state: &mut State,
    ) -> Result<RunSummary, ExecError> {
        let mut summary = RunSummary::default();
        let no_args = Vec::new();

        for name in &plan.order {
            let will_run = plan.statuses.get(name).is_some_and(|s| s.will_run);
            if !will_run {
                summary.skipped += 1;
                debug!("skipping {name}: fresh");
                continue;
            }

            if self.interrupted() {
                return Err(ExecError::Interrupted);
            }

            let Ok(task) = self.graph.task(name) else {
                continue;
            };

            if !task.working_dir.is_dir() {
                return Err(ExecError::MissingWorkingDir {
                    task: name.clone(),
                    dir: task.working_dir.clone(),
                });
            }

            let values = args.get(name).unwrap_or(&no_args);
            let command = substitute(&task.command, values);
            let started = epoch_seconds();

            info!("running {name}");
            let exit = self
                .shell
                .run(&command, &task.working_dir)
                .map_err(|e| ExecError::Spawn {
                    task: name.clone(),
                    message: e.to_string(),
                })?;

            if self.interrupted() {
                return Err(ExecError::Interrupted);
            }

            if !exit.success() {
                return Err(ExecError::TaskFailed {
                    task: name.clone(),
                    code: exit.code().unwrap_or(-1),
                });
            }

            self.record_success(plan, name, task, started, state)?;
            summary.executed.push(name.clone());
        }

        Ok(summary)
    }

    /// Capture the inputs as this run saw them and make the entry durable
    /// before the next task starts.
    fn record_success(
        &self,
        plan: &Plan,
        name: &str,
        task: &tasktree_recipe::Task,
        started: u64,
        state: &mut State,
    ) -> Result<(), StateError> {
        let mut input_state = BTreeMap::new();
        // Pattern errors were already surfaced during planning.
        if let Ok(inputs) = analyze::resolve_task_inputs(self.graph, task) {
            for input in inputs {
                if let Some(mtime) = input.mtime {
                    let _ = input_state.insert(input.path, mtime);
                }
            }
        }

        if let Some(key) = plan.cache_keys.get(name) {
            state.insert(
                key.clone(),
                StateEntry {
                    last_run: started,
                    input_state,
                },
            );
            state.save(&self.state_path)?;
        }
        Ok(())
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Literal `{{name}}` replacement, restricted to declared names. Unknown
/// placeholders were already rejected at graph build time.
pub fn substitute(command: &str, values: &[ArgValue]) -> String {
    let mut result = command.to_string();
    for value in values {
        result = result.replace(&format!("{{{{{}}}}}", value.name), &value.canonical);
    }
    result
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasktree_recipe::ParamType;

    fn value(name: &str, canonical: &str) -> ArgValue {
        ArgValue {
            name: name.to_string(),
            ty: ParamType::Str,
            canonical: canonical.to_string(),
        }
    }

    #[test]
    fn substitution_is_literal_and_name_scoped() {
        let values = [value("host", "a.example.com"), value("port", "22")];
        assert_eq!(
            substitute("ssh -p {{port}} {{host}} && echo {{host}}", &values),
            "ssh -p 22 a.example.com && echo a.example.com"
        );
        // Placeholders for other names are left alone.
        assert_eq!(substitute("echo {{other}}", &values), "echo {{other}}");
    }
}

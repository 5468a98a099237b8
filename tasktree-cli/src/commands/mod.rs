//! The `tt` command line.
//!
//! One argv parser for the whole surface. Every diagnostic command consumes
//! the same status records the executor uses; none of them re-computes
//! staleness.

use clap::Parser;
use std::path::{Path, PathBuf};

pub mod dry_run;
pub mod init;
pub mod list;
pub mod run;
pub mod show;
pub mod tree;

use tasktree_engine::{
    ArgError, ExecError, PlanError, STATE_FILE_NAME, State, StateError,
};
use tasktree_graph::{GraphError, TaskGraph};
use tasktree_recipe::{RawRecipe, RecipeError, find_recipe_file, resolve};

/// Task Tree - run declared tasks, re-running only what changed
#[derive(Parser)]
#[command(name = "tt")]
#[command(about = "Task Tree - run declared tasks, re-running only what changed")]
#[command(version)]
pub struct Cli {
    /// Use an explicit recipe file instead of searching upward from the
    /// current directory
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// List all tasks, one line each
    #[arg(long, conflicts_with = "task")]
    pub list: bool,

    /// Write a starter recipe in the current directory
    #[arg(long, conflicts_with = "task")]
    pub init: bool,

    /// Display a task's normalised definition
    #[arg(long, value_name = "TASK", conflicts_with = "task")]
    pub show: Option<String>,

    /// Display a task's dependency tree with freshness
    #[arg(long, value_name = "TASK")]
    pub tree: Option<String>,

    /// Display the execution plan with reasons, without running anything
    #[arg(long, value_name = "TASK")]
    pub dry_run: Option<String>,

    /// Task to execute
    pub task: Option<String>,

    /// Arguments for the task: positional in declared order, or name=value
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Top-level error with its exit-code mapping: 1 for recipe, configuration
/// and argument errors, 2 for execution failures, 130 when cancelled.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Recipe loading or normalisation failed
    #[error(transparent)]
    Recipe(#[from] RecipeError),

    /// Graph validation failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Staleness analysis failed
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Argument binding or coercion failed
    #[error(transparent)]
    Arg(#[from] ArgError),

    /// A task failed or could not be started
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// State persistence failed
    #[error(transparent)]
    State(#[from] StateError),

    /// Bad invocation
    #[error("{0}")]
    Usage(String),
}

impl CliError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exec(ExecError::Interrupted) => 130,
            Self::Exec(_) | Self::State(_) => 2,
            _ => 1,
        }
    }
}

/// A loaded project: the recipe's graph plus the state file beside it,
/// already pruned against the graph.
pub struct Project {
    /// The validated graph
    pub graph: TaskGraph,
    /// Pruned state
    pub state: State,
    /// Path the state is persisted to
    pub state_path: PathBuf,
}

/// Locate, load, resolve and validate the recipe, then load and prune the
/// state file next to it.
pub fn load_project(file: Option<&Path>) -> Result<Project, CliError> {
    let recipe_path = match file {
        Some(path) => path.to_path_buf(),
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| CliError::Usage(format!("cannot determine working directory: {e}")))?;
            find_recipe_file(&cwd).ok_or(RecipeError::NotFound(cwd))?
        }
    };

    let raw = RawRecipe::load(&recipe_path)?;
    tracing::debug!("using recipe {}", raw.path.display());
    let graph = TaskGraph::build(resolve(&raw)?)?;

    let state_path = raw
        .path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"))
        .join(STATE_FILE_NAME);
    let mut state = State::load(&state_path);
    let _ = state.prune(&graph);

    Ok(Project {
        graph,
        state,
        state_path,
    })
}

/// Route a parsed invocation to its command.
pub fn dispatch(cli: Cli) -> Result<(), CliError> {
    if cli.init {
        return init::execute(cli.file.as_deref());
    }
    if cli.list {
        return list::execute(cli.file.as_deref());
    }
    if let Some(target) = &cli.show {
        return show::execute(cli.file.as_deref(), target);
    }

    // For --tree and --dry-run the remaining positionals are the task's
    // arguments, exactly as they would be for execution.
    let tokens: Vec<String> = cli.task.iter().chain(cli.args.iter()).cloned().collect();

    if let Some(target) = &cli.tree {
        return tree::execute(cli.file.as_deref(), target, &tokens);
    }
    if let Some(target) = &cli.dry_run {
        return dry_run::execute(cli.file.as_deref(), target, &tokens);
    }

    match &cli.task {
        Some(target) => run::execute(cli.file.as_deref(), target, &cli.args),
        None => Err(CliError::Usage(
            "no task given; try `tt --list` or `tt --help`".to_string(),
        )),
    }
}

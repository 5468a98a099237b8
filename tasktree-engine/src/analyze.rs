//! Staleness classification.
//!
//! Walks the reachable portion of the graph in topological order and applies
//! the decision rules, first match wins:
//!
//! 1. no outputs, no declared inputs, no inherited inputs → `no_outputs`
//! 2. no state entry for the cache key → `never_run` / `args_changed`
//! 3. entry recorded under an older definition → `definition_changed`
//!    (defensive; unreachable once the state is pruned)
//! 4. an input newer than `last_run`, or missing → `inputs_changed`
//! 5. a dependency will run → `dependency_triggered`
//! 6. otherwise → `fresh`
//!
//! Rule 4 compares against `last_run` rather than file-to-file against
//! `input_state`, so a clock that only moves forward can never miss a
//! change; `input_state` is consulted only to notice paths that vanished.

use crate::fingerprint;
use crate::state::{State, StateEntry};
use crate::status::{Plan, Reason, TaskStatus};
use crate::value::ArgValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tasktree_graph::{GraphError, TaskGraph};
use tasktree_recipe::Task;

/// Plan error types.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Target unknown or graph query failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Unparseable glob pattern
    #[error("task `{task}`: invalid glob `{pattern}`: {message}")]
    Glob {
        /// Task whose inputs were being resolved
        task: String,
        /// The pattern as written
        pattern: String,
        /// Parser failure
        message: String,
    },
}

/// A resolved input path and its current mtime, `None` when the file is
/// missing.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedInput {
    pub path: String,
    pub mtime: Option<u64>,
}

/// Status API entry point: classify every task reachable from `target`.
///
/// `args` carries the coerced argument values per task; `state` must already
/// be pruned against `graph`.
pub fn plan(
    graph: &TaskGraph,
    state: &State,
    target: &str,
    args: &BTreeMap<String, Vec<ArgValue>>,
) -> Result<Plan, PlanError> {
    let order = graph.reachable_order(target)?;
    let mut statuses: BTreeMap<String, TaskStatus> = BTreeMap::new();
    let mut cache_keys = BTreeMap::new();

    for name in &order {
        let task = graph.task(name)?;
        let inputs = resolve_task_inputs(graph, task)
            .map_err(|(pattern, message)| PlanError::Glob {
                task: name.clone(),
                pattern,
                message,
            })?;

        let task_hash = fingerprint::task_fingerprint(task);
        let args_hash = if task.parameters.is_empty() {
            None
        } else {
            args.get(name).map(|values| fingerprint::args_fingerprint(values))
        };
        let key = fingerprint::cache_key(&task_hash, args_hash.as_deref());

        let entry = state.get(&key);
        let dependency_triggered = task
            .dependencies
            .iter()
            .any(|dep| statuses.get(dep).is_some_and(|s| s.will_run));
        let inherits_inputs = !graph.implicit_inputs(name).is_empty();

        let (reason, changed_files) = classify(
            task,
            &task_hash,
            args_hash.as_deref(),
            entry,
            &inputs,
            inherits_inputs,
            dependency_triggered,
            state,
        );

        tracing::debug!("{name}: {reason}");

        let _ = statuses.insert(
            name.clone(),
            TaskStatus {
                qualified_name: name.clone(),
                will_run: reason.is_stale(),
                reason,
                changed_files,
                last_run: entry.map(|e| e.last_run),
            },
        );
        let _ = cache_keys.insert(name.clone(), key);
    }

    Ok(Plan {
        order,
        statuses,
        cache_keys,
    })
}

fn classify(
    task: &Task,
    task_hash: &str,
    args_hash: Option<&str>,
    entry: Option<&StateEntry>,
    inputs: &[ResolvedInput],
    inherits_inputs: bool,
    dependency_triggered: bool,
    state: &State,
) -> (Reason, Vec<String>) {
    // A task with nothing to compare against, not even inherited inputs,
    // is undecidable and must always run.
    if task.outputs.is_empty() && task.explicit_inputs.is_empty() && !inherits_inputs {
        return (Reason::NoOutputs, Vec::new());
    }

    let Some(entry) = entry else {
        if state.has_task(task_hash) {
            return (Reason::ArgsChanged, Vec::new());
        }
        if let Some(args_hash) = args_hash
            && state.has_args_elsewhere(task_hash, args_hash)
        {
            return (Reason::DefinitionChanged, Vec::new());
        }
        return (Reason::NeverRun, Vec::new());
    };

    let mut changed_files: Vec<String> = Vec::new();
    for input in inputs {
        match input.mtime {
            None => changed_files.push(input.path.clone()),
            Some(mtime) if mtime > entry.last_run => changed_files.push(input.path.clone()),
            Some(_) => {}
        }
    }
    for path in entry.input_state.keys() {
        if !Path::new(path).exists() {
            changed_files.push(path.clone());
        }
    }
    if !changed_files.is_empty() {
        changed_files.sort();
        changed_files.dedup();
        return (Reason::InputsChanged, changed_files);
    }

    if dependency_triggered {
        return (Reason::DependencyTriggered, Vec::new());
    }

    (Reason::Fresh, Vec::new())
}

/// Resolve a task's explicit and implicit input globs.
pub(crate) fn resolve_task_inputs(
    graph: &TaskGraph,
    task: &Task,
) -> Result<Vec<ResolvedInput>, (String, String)> {
    let mut inputs = Vec::new();
    for pattern in &task.explicit_inputs {
        resolve_glob(&task.working_dir, pattern, &mut inputs)
            .map_err(|message| (pattern.clone(), message))?;
    }
    for implicit in graph.implicit_inputs(&task.qualified_name) {
        resolve_glob(&implicit.base, &implicit.pattern, &mut inputs)
            .map_err(|message| (implicit.pattern.clone(), message))?;
    }
    Ok(inputs)
}

/// Expand one glob against its base directory.
///
/// A literal pattern (no metacharacters) always produces exactly one entry,
/// mtime-less when the file is missing, so missing declared inputs count as
/// changes instead of silently disappearing from the input set.
fn resolve_glob(
    base: &Path,
    pattern: &str,
    out: &mut Vec<ResolvedInput>,
) -> Result<(), String> {
    let full = if Path::new(pattern).is_absolute() {
        PathBuf::from(pattern)
    } else {
        base.join(pattern)
    };
    let full_str = full.to_string_lossy().into_owned();

    if is_literal(pattern) {
        out.push(ResolvedInput {
            mtime: mtime_of(&full),
            path: full_str,
        });
        return Ok(());
    }

    let matches = glob::glob(&full_str).map_err(|e| e.to_string())?;
    for path in matches.flatten() {
        out.push(ResolvedInput {
            mtime: mtime_of(&path),
            path: path.to_string_lossy().into_owned(),
        });
    }
    Ok(())
}

fn is_literal(pattern: &str) -> bool {
    !pattern.contains(['*', '?', '['])
}

/// Current mtime in whole seconds, `None` for missing or unreadable files.
pub(crate) fn mtime_of(path: &Path) -> Option<u64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    modified
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

//! Shared staleness records.
//!
//! [`TaskStatus`] and its [`Reason`] are the single source of truth: the
//! executor, `--tree` and `--dry-run` all consume the same records, and no
//! renderer re-computes staleness on its own.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Why a task will or will not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// Nothing changed since the last successful run
    Fresh,
    /// An input is newer than the last run, or vanished
    InputsChanged,
    /// The stored entry belongs to an older definition of this task
    DefinitionChanged,
    /// No record of this task ever running
    NeverRun,
    /// A dependency will run, so this task must follow
    DependencyTriggered,
    /// Neither outputs nor inputs declared, so freshness is undecidable
    NoOutputs,
    /// This task ran before, but with different arguments
    ArgsChanged,
}

impl Reason {
    /// The snake_case name used in user-facing output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::InputsChanged => "inputs_changed",
            Self::DefinitionChanged => "definition_changed",
            Self::NeverRun => "never_run",
            Self::DependencyTriggered => "dependency_triggered",
            Self::NoOutputs => "no_outputs",
            Self::ArgsChanged => "args_changed",
        }
    }

    /// Whether this reason marks the task stale.
    #[must_use]
    pub fn is_stale(self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-task staleness verdict.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    /// The task this verdict is about
    pub qualified_name: String,
    /// Whether execution will include this task
    pub will_run: bool,
    /// First decision rule that matched
    pub reason: Reason,
    /// Files behind an `inputs_changed` verdict
    pub changed_files: Vec<String>,
    /// `last_run` of the matching state entry, when one exists
    pub last_run: Option<u64>,
}

/// The execution plan for one target: reachable tasks in topological order,
/// their statuses, and the cache keys execution will write under.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Reachable tasks, dependencies first
    pub order: Vec<String>,
    /// Status per task in `order`
    pub statuses: BTreeMap<String, TaskStatus>,
    /// Cache key per task in `order`
    pub cache_keys: BTreeMap<String, String>,
}

impl Plan {
    /// The status of one task, if it is part of this plan.
    #[must_use]
    pub fn status(&self, name: &str) -> Option<&TaskStatus> {
        self.statuses.get(name)
    }

    /// Tasks that will run, in execution order.
    pub fn to_run(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter(|name| self.statuses.get(*name).is_some_and(|s| s.will_run))
            .map(String::as_str)
    }
}

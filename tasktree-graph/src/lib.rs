//! Task dependency graph for Task Tree.
//!
//! Takes the flat mapping of normalised tasks produced by import resolution
//! and turns it into a validated, immutable graph:
//!
//! - dangling and duplicate dependency references are rejected
//! - `{{name}}` placeholders must match declared parameters
//! - cycles are rejected with a readable cycle description
//! - implicit inputs are computed (one hop: a dependency's outputs, or its
//!   explicit inputs if it declares no outputs)
//! - the topological order is deterministic, breaking ties lexicographically
//!
//! Edges run from dependent to dependency; scheduling emits dependencies
//! first.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::path::PathBuf;
use tasktree_recipe::Task;

/// Error types for graph construction and queries.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Dependency reference that resolves to no task
    #[error("task `{task}` depends on unknown task `{dependency}`")]
    UnknownDependency {
        /// The referencing task
        task: String,
        /// The reference as written
        dependency: String,
    },

    /// The same dependency listed twice
    #[error("task `{task}` lists dependency `{dependency}` more than once")]
    DuplicateDependency {
        /// The referencing task
        task: String,
        /// The duplicated reference
        dependency: String,
    },

    /// Dependency cycle
    #[error("dependency cycle: {0}")]
    Cycle(String),

    /// Command placeholder with no matching parameter
    #[error("task `{task}`: command references undeclared parameter `{{{{{placeholder}}}}}`")]
    UndeclaredPlaceholder {
        /// The offending task
        task: String,
        /// The placeholder name as written
        placeholder: String,
    },

    /// Query for a task that is not in the graph
    #[error("unknown task `{0}`")]
    UnknownTask(String),
}

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// A path glob tied to the base directory it resolves against.
///
/// Globs are never rewritten string-wise; an implicit input inherited from a
/// dependency keeps the dependency's working directory as its base.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct InputGlob {
    /// Absolute base directory
    pub base: PathBuf,
    /// Pattern as written in the recipe
    pub pattern: String,
}

/// The validated, immutable task graph plus its topological order.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: BTreeMap<String, Task>,
    dependents: BTreeMap<String, Vec<String>>,
    implicit_inputs: BTreeMap<String, Vec<InputGlob>>,
    order: Vec<String>,
}

impl TaskGraph {
    /// Validate the flat task mapping and build the graph.
    pub fn build(tasks: BTreeMap<String, Task>) -> GraphResult<Self> {
        for task in tasks.values() {
            let mut seen = BTreeSet::new();
            for dep in &task.dependencies {
                if !tasks.contains_key(dep) {
                    return Err(GraphError::UnknownDependency {
                        task: task.qualified_name.clone(),
                        dependency: dep.clone(),
                    });
                }
                if !seen.insert(dep.as_str()) {
                    return Err(GraphError::DuplicateDependency {
                        task: task.qualified_name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }

            for placeholder in placeholders(&task.command) {
                if !task.parameters.iter().any(|p| p.name == placeholder) {
                    return Err(GraphError::UndeclaredPlaceholder {
                        task: task.qualified_name.clone(),
                        placeholder,
                    });
                }
            }
        }

        let mut dependents: BTreeMap<String, Vec<String>> =
            tasks.keys().map(|name| (name.clone(), Vec::new())).collect();
        for task in tasks.values() {
            for dep in &task.dependencies {
                if let Some(entry) = dependents.get_mut(dep) {
                    entry.push(task.qualified_name.clone());
                }
            }
        }

        let order = topological_order(&tasks, &dependents)?;

        let mut implicit_inputs = BTreeMap::new();
        for task in tasks.values() {
            let mut inputs = Vec::new();
            for dep_name in &task.dependencies {
                if let Some(dep) = tasks.get(dep_name) {
                    let patterns = if dep.outputs.is_empty() {
                        &dep.explicit_inputs
                    } else {
                        &dep.outputs
                    };
                    for pattern in patterns {
                        inputs.push(InputGlob {
                            base: dep.working_dir.clone(),
                            pattern: pattern.clone(),
                        });
                    }
                }
            }
            implicit_inputs.insert(task.qualified_name.clone(), inputs);
        }

        tracing::debug!("graph built: {} tasks", tasks.len());

        Ok(Self {
            tasks,
            dependents,
            implicit_inputs,
            order,
        })
    }

    /// Look up a task by qualified name.
    pub fn task(&self, name: &str) -> GraphResult<&Task> {
        self.tasks
            .get(name)
            .ok_or_else(|| GraphError::UnknownTask(name.to_string()))
    }

    /// Whether a task exists in the graph.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// All tasks, in qualified-name order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Number of tasks in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the graph has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Implicit inputs of a task (empty for unknown names).
    #[must_use]
    pub fn implicit_inputs(&self, name: &str) -> &[InputGlob] {
        self.implicit_inputs
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Direct dependents of a task (empty for unknown names).
    #[must_use]
    pub fn dependents(&self, name: &str) -> &[String] {
        self.dependents.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The full topological order: dependencies before dependents, ties
    /// broken lexicographically.
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// The topological order restricted to `target` and its transitive
    /// dependencies.
    pub fn reachable_order(&self, target: &str) -> GraphResult<Vec<String>> {
        let _ = self.task(target)?;

        let mut reachable = BTreeSet::new();
        let mut stack = vec![target.to_string()];
        while let Some(name) = stack.pop() {
            if reachable.insert(name.clone())
                && let Some(task) = self.tasks.get(&name)
            {
                stack.extend(task.dependencies.iter().cloned());
            }
        }

        Ok(self
            .order
            .iter()
            .filter(|name| reachable.contains(*name))
            .cloned()
            .collect())
    }
}

/// Kahn's algorithm with a min-heap so incomparable tasks come out in
/// lexicographic order.
fn topological_order(
    tasks: &BTreeMap<String, Task>,
    dependents: &BTreeMap<String, Vec<String>>,
) -> GraphResult<Vec<String>> {
    let mut in_degree: BTreeMap<&str, usize> = tasks
        .values()
        .map(|task| (task.qualified_name.as_str(), task.dependencies.len()))
        .collect();

    let mut ready: BinaryHeap<Reverse<&str>> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| Reverse(*name))
        .collect();

    let mut order = Vec::with_capacity(tasks.len());
    while let Some(Reverse(name)) = ready.pop() {
        order.push(name.to_string());

        if let Some(deps) = dependents.get(name) {
            for dependent in deps {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(dependent.as_str()));
                    }
                }
            }
        }
    }

    if order.len() == tasks.len() {
        Ok(order)
    } else {
        Err(GraphError::Cycle(describe_cycle(tasks)))
    }
}

/// DFS with a recursion stack; renders the first cycle found as
/// `a -> b -> a`.
fn describe_cycle(tasks: &BTreeMap<String, Task>) -> String {
    fn dfs<'a>(
        name: &'a str,
        tasks: &'a BTreeMap<String, Task>,
        visited: &mut BTreeSet<&'a str>,
        stack: &mut BTreeSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Option<String> {
        let _ = visited.insert(name);
        let _ = stack.insert(name);
        path.push(name);

        if let Some(task) = tasks.get(name) {
            for dep in &task.dependencies {
                if stack.contains(dep.as_str()) {
                    let start = path
                        .iter()
                        .position(|entry| *entry == dep.as_str())
                        .unwrap_or(0);
                    let mut cycle: Vec<&str> = path[start..].to_vec();
                    cycle.push(dep);
                    return Some(cycle.join(" -> "));
                }
                if !visited.contains(dep.as_str())
                    && let Some(found) = dfs(dep, tasks, visited, stack, path)
                {
                    return Some(found);
                }
            }
        }

        let _ = path.pop();
        let _ = stack.remove(name);
        None
    }

    let mut visited = BTreeSet::new();
    let mut stack = BTreeSet::new();
    let mut path = Vec::new();
    for name in tasks.keys() {
        if !visited.contains(name.as_str())
            && let Some(cycle) = dfs(name, tasks, &mut visited, &mut stack, &mut path)
        {
            return cycle;
        }
    }

    "cycle could not be reconstructed".to_string()
}

/// Extract `{{name}}` placeholder names from a command string, in order.
fn placeholders(command: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = command;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                found.push(after[..end].to_string());
                rest = &after[end + 2..];
            }
            None => break,
        }
    }
    found
}

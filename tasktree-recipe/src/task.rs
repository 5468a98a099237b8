//! Normalised task records.

use crate::param::ParamSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A fully normalised task.
///
/// Created by import resolution, immutable afterwards. Input and output
/// globs are kept as written; they are semantically relative to
/// `working_dir` and only joined at resolution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Dotted fully-qualified identifier, unique in the graph
    pub qualified_name: String,
    /// Optional prose description
    pub description: Option<String>,
    /// Qualified names of direct dependencies, in declared order
    pub dependencies: Vec<String>,
    /// Input path globs, relative to `working_dir` unless absolute
    pub explicit_inputs: Vec<String>,
    /// Output path globs, same resolution
    pub outputs: Vec<String>,
    /// Absolute working directory
    pub working_dir: PathBuf,
    /// Declared parameters, in declared order
    pub parameters: Vec<ParamSpec>,
    /// Shell command with `{{name}}` placeholders
    pub command: String,
}

impl Task {
    /// The namespace part of the qualified name, if this task was imported.
    pub fn namespace(&self) -> Option<&str> {
        self.qualified_name.split_once('.').map(|(ns, _)| ns)
    }
}

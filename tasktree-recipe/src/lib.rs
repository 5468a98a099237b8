//! Recipe parsing and normalisation for Task Tree.
//!
//! Turns one root recipe file plus its single-level imports into a flat
//! mapping of fully-qualified, normalised [`Task`] records:
//!
//! - YAML loading with source-located errors
//! - `name[:type][=default]` parameter literals
//! - import namespacing and dependency rewriting
//!
//! Graph-level validation (dangling references, cycles, placeholders) is the
//! graph crate's job; this crate only gets each task into its normal form.

pub mod loader;
pub mod param;
pub mod resolve;
pub mod task;

pub use loader::{RECIPE_FILE_NAMES, RawImport, RawRecipe, RawTask, find_recipe_file};
pub use param::{ParamSpec, ParamType};
pub use resolve::resolve;
pub use task::Task;

use std::path::PathBuf;

/// Recipe error types.
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    /// File system I/O error
    #[error("IO error reading {0}: {1}")]
    Io(PathBuf, String),

    /// YAML parsing error
    #[error("parse error in {0}: {1}")]
    Parse(PathBuf, String),

    /// Schema violation in a task table
    #[error("{file}: task `{task}`: {message}")]
    TaskSchema {
        /// Recipe file the task is defined in
        file: PathBuf,
        /// Task name as written
        task: String,
        /// What was wrong with the table
        message: String,
    },

    /// Malformed parameter literal
    #[error("{file}: task `{task}`: bad parameter spec `{spec}`: {message}")]
    BadParam {
        /// Recipe file the task is defined in
        file: PathBuf,
        /// Task name as written
        task: String,
        /// The literal as written
        spec: String,
        /// What was wrong with it
        message: String,
    },

    /// Malformed import directive
    #[error("{file}: import `{namespace}`: {message}")]
    BadImport {
        /// Root recipe file
        file: PathBuf,
        /// The `as` namespace
        namespace: String,
        /// What was wrong with the directive
        message: String,
    },

    /// Imported file declares its own imports
    #[error("{0}: transitive imports are not allowed")]
    TransitiveImport(PathBuf),

    /// Imported task references a task outside its own file
    #[error("{file}: task `{task}`: dependency `{dependency}` references a task outside the imported file")]
    CrossFileReference {
        /// Imported recipe file
        file: PathBuf,
        /// Qualified name of the referencing task
        task: String,
        /// The offending reference as written
        dependency: String,
    },

    /// Two tasks normalised to the same qualified name
    #[error("duplicate task `{0}`")]
    DuplicateTask(String),

    /// No recipe file found searching upward
    #[error("no recipe file (tasktree.yaml or tt.yaml) found from {0} upward")]
    NotFound(PathBuf),
}

/// Result type for recipe operations.
pub type Result<T> = std::result::Result<T, RecipeError>;

/// Plain identifier: leading letter or underscore, then letters, digits,
/// underscores and dashes. Dots are reserved for namespace qualification.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

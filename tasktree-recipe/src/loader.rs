//! Recipe file discovery and raw YAML loading.
//!
//! The loader reads YAML and returns uninterpreted task tables plus any
//! `import` directives. Task semantics are the resolver's business.

use crate::{RecipeError, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Recipe file names searched for, in order, in each directory.
pub const RECIPE_FILE_NAMES: [&str; 2] = ["tasktree.yaml", "tt.yaml"];

/// Search upward from `start` for the nearest recipe file.
pub fn find_recipe_file(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        for name in RECIPE_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// An `import` directive: `{file, as}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawImport {
    /// Path of the imported file, relative to the importing file
    pub file: String,
    /// Namespace prefix for the imported tasks
    #[serde(rename = "as")]
    pub namespace: String,
}

/// A task table as written in the recipe, uninterpreted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTask {
    /// Prose description
    pub desc: Option<String>,
    /// Shell command
    pub cmd: Option<String>,
    /// Dependency references as written
    #[serde(default)]
    pub deps: Vec<String>,
    /// Input path globs
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Output path globs
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Working directory override, resolved against the file's parent
    pub dir: Option<String>,
    /// Parameter literals (`name[:type][=default]`)
    #[serde(default)]
    pub args: Vec<String>,
}

/// A parsed recipe file: import directives plus ordered raw task tables.
#[derive(Debug, Clone)]
pub struct RawRecipe {
    /// Absolute path of the file
    pub path: PathBuf,
    /// `import` directives, in declared order
    pub imports: Vec<RawImport>,
    /// Task tables in declaration order
    pub tasks: Vec<(String, RawTask)>,
}

impl RawRecipe {
    /// Load and parse a recipe file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = absolutize(path.as_ref())?;
        let content = std::fs::read_to_string(&path)
            .map_err(|e| RecipeError::Io(path.clone(), e.to_string()))?;
        Self::parse(path, &content)
    }

    /// Parse recipe content. Split from [`RawRecipe::load`] for tests.
    pub fn parse(path: PathBuf, content: &str) -> Result<Self> {
        let doc: serde_yaml::Mapping = serde_yaml::from_str(content)
            .map_err(|e| RecipeError::Parse(path.clone(), e.to_string()))?;

        let mut imports = Vec::new();
        let mut tasks = Vec::new();

        for (key, value) in doc {
            let name = match key {
                Value::String(name) => name,
                _ => {
                    return Err(RecipeError::Parse(
                        path,
                        "top-level keys must be task names".to_string(),
                    ));
                }
            };

            if name == "import" {
                imports = serde_yaml::from_value(value).map_err(|e| {
                    RecipeError::Parse(path.clone(), format!("bad import list: {e}"))
                })?;
            } else {
                let task: RawTask =
                    serde_yaml::from_value(value).map_err(|e| RecipeError::TaskSchema {
                        file: path.clone(),
                        task: name.clone(),
                        message: e.to_string(),
                    })?;
                tasks.push((name, task));
            }
        }

        tracing::debug!(
            "loaded {} task tables and {} imports from {}",
            tasks.len(),
            imports.len(),
            path.display()
        );

        Ok(Self {
            path,
            imports,
            tasks,
        })
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .map_err(|e| RecipeError::Io(path.to_path_buf(), e.to_string()))
    }
}

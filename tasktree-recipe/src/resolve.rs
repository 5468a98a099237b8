//! Import resolution and task normalisation.
//!
//! Merges the root recipe and its imported files into a single flat mapping
//! keyed by qualified name. Imported files may not themselves import, and
//! may only depend on tasks defined in the same file.

use crate::loader::{RawRecipe, RawTask};
use crate::param::ParamSpec;
use crate::task::Task;
use crate::{RecipeError, Result, is_identifier};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Resolve the root recipe and its imports into the flat task mapping.
pub fn resolve(root: &RawRecipe) -> Result<BTreeMap<String, Task>> {
    let root_dir = parent_of(&root.path);

    let mut namespaces = BTreeSet::new();
    for import in &root.imports {
        if !is_identifier(&import.namespace) {
            return Err(RecipeError::BadImport {
                file: root.path.clone(),
                namespace: import.namespace.clone(),
                message: "namespace must be a plain identifier".to_string(),
            });
        }
        if !namespaces.insert(import.namespace.as_str()) {
            return Err(RecipeError::BadImport {
                file: root.path.clone(),
                namespace: import.namespace.clone(),
                message: "namespace used by more than one import".to_string(),
            });
        }
        if root.tasks.iter().any(|(name, _)| name == &import.namespace) {
            return Err(RecipeError::BadImport {
                file: root.path.clone(),
                namespace: import.namespace.clone(),
                message: "namespace collides with a root-level task".to_string(),
            });
        }
    }

    let mut merged = BTreeMap::new();

    for (name, raw) in &root.tasks {
        let task = normalise(&root.path, &root_dir, None, name, raw)?;
        insert(&mut merged, task)?;
    }

    for import in &root.imports {
        let imported = RawRecipe::load(root_dir.join(&import.file))?;
        if !imported.imports.is_empty() {
            return Err(RecipeError::TransitiveImport(imported.path));
        }

        let base = parent_of(&imported.path);
        for (name, raw) in &imported.tasks {
            let task = normalise(&imported.path, &base, Some(&import.namespace), name, raw)?;
            insert(&mut merged, task)?;
        }

        tracing::debug!(
            "merged {} tasks from {} as `{}`",
            imported.tasks.len(),
            imported.path.display(),
            import.namespace
        );
    }

    Ok(merged)
}

fn insert(merged: &mut BTreeMap<String, Task>, task: Task) -> Result<()> {
    let name = task.qualified_name.clone();
    if merged.insert(name.clone(), task).is_some() {
        return Err(RecipeError::DuplicateTask(name));
    }
    Ok(())
}

fn parent_of(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// Normalise one raw task table into a [`Task`].
fn normalise(
    file: &Path,
    base: &Path,
    namespace: Option<&str>,
    name: &str,
    raw: &RawTask,
) -> Result<Task> {
    if !is_identifier(name) {
        return Err(RecipeError::TaskSchema {
            file: file.to_path_buf(),
            task: name.to_string(),
            message: "task names must be plain identifiers".to_string(),
        });
    }

    let command = raw.cmd.clone().ok_or_else(|| RecipeError::TaskSchema {
        file: file.to_path_buf(),
        task: name.to_string(),
        message: "missing `cmd`".to_string(),
    })?;

    let working_dir = match &raw.dir {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            if dir.is_absolute() { dir } else { base.join(dir) }
        }
        None => base.to_path_buf(),
    };

    let mut dependencies = Vec::with_capacity(raw.deps.len());
    for dep in &raw.deps {
        dependencies.push(rewrite_dependency(file, namespace, name, dep)?);
    }

    let mut parameters: Vec<ParamSpec> = Vec::with_capacity(raw.args.len());
    for literal in &raw.args {
        let spec = ParamSpec::parse(literal).map_err(|message| RecipeError::BadParam {
            file: file.to_path_buf(),
            task: name.to_string(),
            spec: literal.clone(),
            message,
        })?;
        if parameters.iter().any(|p| p.name == spec.name) {
            return Err(RecipeError::BadParam {
                file: file.to_path_buf(),
                task: name.to_string(),
                spec: literal.clone(),
                message: format!("parameter `{}` declared more than once", spec.name),
            });
        }
        parameters.push(spec);
    }

    let qualified_name = match namespace {
        Some(ns) => format!("{ns}.{name}"),
        None => name.to_string(),
    };

    Ok(Task {
        qualified_name,
        description: raw.desc.clone(),
        dependencies,
        explicit_inputs: raw.inputs.clone(),
        outputs: raw.outputs.clone(),
        working_dir,
        parameters,
        command,
    })
}

/// Rewrite a dependency reference into its qualified form.
///
/// Inside an imported file a bare `x` means `namespace.x`; anything already
/// qualified would reach outside the file and is rejected. Root-file
/// references are kept as written (they may legitimately point at imports).
fn rewrite_dependency(
    file: &Path,
    namespace: Option<&str>,
    task: &str,
    dep: &str,
) -> Result<String> {
    match namespace {
        Some(ns) => {
            if dep.contains('.') {
                Err(RecipeError::CrossFileReference {
                    file: file.to_path_buf(),
                    task: format!("{ns}.{task}"),
                    dependency: dep.to_string(),
                })
            } else {
                Ok(format!("{ns}.{dep}"))
            }
        }
        None => Ok(dep.to_string()),
    }
}

//! Import resolution against real files on disk.

use std::fs;
use tasktree_recipe::{RawRecipe, RecipeError, find_recipe_file, resolve};
use tempfile::TempDir;

#[test]
fn resolves_single_import_into_flat_namespace() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("build")).unwrap();

    fs::write(
        temp.path().join("build/tasks.yaml"),
        r#"
compile:
  cmd: cargo build
  inputs: ["src/*.rs"]
  outputs: ["target/debug/app"]
link:
  cmd: cargo build --release
  deps: [compile]
"#,
    )
    .unwrap();

    let root_path = temp.path().join("tasktree.yaml");
    fs::write(
        &root_path,
        r#"
import:
  - file: build/tasks.yaml
    as: build

pkg:
  cmd: tar cf pkg.tar target
  deps: [build.link]
"#,
    )
    .unwrap();

    let root = RawRecipe::load(&root_path).unwrap();
    let tasks = resolve(&root).unwrap();

    let names: Vec<&str> = tasks.keys().map(String::as_str).collect();
    assert_eq!(names, ["build.compile", "build.link", "pkg"]);

    // Imported working dirs default to the imported file's parent.
    assert_eq!(tasks["build.compile"].working_dir, temp.path().join("build"));
    assert_eq!(tasks["pkg"].working_dir, temp.path());

    // Bare deps inside the import were namespaced; root deps kept as written.
    assert_eq!(tasks["build.link"].dependencies, ["build.compile"]);
    assert_eq!(tasks["pkg"].dependencies, ["build.link"]);

    // Globs are carried as written, not rewritten string-wise.
    assert_eq!(tasks["build.compile"].explicit_inputs, ["src/*.rs"]);
}

#[test]
fn imported_dir_override_resolves_against_import_parent() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("sub/deep")).unwrap();

    fs::write(
        temp.path().join("sub/tasks.yaml"),
        r#"
gen:
  cmd: ./generate.sh
  dir: deep
"#,
    )
    .unwrap();

    let root_path = temp.path().join("tasktree.yaml");
    fs::write(
        &root_path,
        r#"
import:
  - file: sub/tasks.yaml
    as: sub
"#,
    )
    .unwrap();

    let tasks = resolve(&RawRecipe::load(&root_path).unwrap()).unwrap();
    assert_eq!(tasks["sub.gen"].working_dir, temp.path().join("sub/deep"));
}

#[test]
fn transitive_imports_are_rejected() {
    let temp = TempDir::new().unwrap();

    fs::write(
        temp.path().join("level2.yaml"),
        "noop:\n  cmd: 'true'\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("level1.yaml"),
        r#"
import:
  - file: level2.yaml
    as: deeper

noop:
  cmd: "true"
"#,
    )
    .unwrap();

    let root_path = temp.path().join("tasktree.yaml");
    fs::write(
        &root_path,
        r#"
import:
  - file: level1.yaml
    as: nested
"#,
    )
    .unwrap();

    let err = resolve(&RawRecipe::load(&root_path).unwrap()).unwrap_err();
    assert!(matches!(err, RecipeError::TransitiveImport(_)));
}

#[test]
fn namespace_collision_with_root_task_is_rejected() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("extra.yaml"), "t:\n  cmd: 'true'\n").unwrap();

    let root_path = temp.path().join("tasktree.yaml");
    fs::write(
        &root_path,
        r#"
import:
  - file: extra.yaml
    as: build

build:
  cmd: make
"#,
    )
    .unwrap();

    let err = resolve(&RawRecipe::load(&root_path).unwrap()).unwrap_err();
    assert!(matches!(err, RecipeError::BadImport { .. }));
    assert!(err.to_string().contains("collides"));
}

#[test]
fn duplicate_namespaces_are_rejected() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.yaml"), "t:\n  cmd: 'true'\n").unwrap();
    fs::write(temp.path().join("b.yaml"), "t:\n  cmd: 'true'\n").unwrap();

    let root_path = temp.path().join("tasktree.yaml");
    fs::write(
        &root_path,
        r#"
import:
  - file: a.yaml
    as: lib
  - file: b.yaml
    as: lib
"#,
    )
    .unwrap();

    let err = resolve(&RawRecipe::load(&root_path).unwrap()).unwrap_err();
    assert!(err.to_string().contains("more than one import"));
}

#[test]
fn missing_import_file_is_fatal() {
    let temp = TempDir::new().unwrap();
    let root_path = temp.path().join("tasktree.yaml");
    fs::write(
        &root_path,
        r#"
import:
  - file: nowhere/tasks.yaml
    as: ghost
"#,
    )
    .unwrap();

    let err = resolve(&RawRecipe::load(&root_path).unwrap()).unwrap_err();
    assert!(matches!(err, RecipeError::Io(_, _)));
}

#[test]
fn recipe_discovery_walks_upward_and_prefers_tasktree_yaml() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("a/b/c");
    fs::create_dir_all(&nested).unwrap();

    fs::write(temp.path().join("tt.yaml"), "t:\n  cmd: 'true'\n").unwrap();
    assert_eq!(
        find_recipe_file(&nested),
        Some(temp.path().join("tt.yaml"))
    );

    // tasktree.yaml in the same directory wins over tt.yaml.
    fs::write(temp.path().join("tasktree.yaml"), "t:\n  cmd: 'true'\n").unwrap();
    assert_eq!(
        find_recipe_file(&nested),
        Some(temp.path().join("tasktree.yaml"))
    );

    // A nearer recipe shadows the outer one.
    fs::write(nested.join("tt.yaml"), "t:\n  cmd: 'true'\n").unwrap();
    assert_eq!(find_recipe_file(&nested), Some(nested.join("tt.yaml")));
}

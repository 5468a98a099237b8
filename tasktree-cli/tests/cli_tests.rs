//! Black-box tests driving the `tt` binary.

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use std::fs;
use tempfile::TempDir;

fn tt(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tt").expect("tt binary build failed");
    let _ = cmd.current_dir(dir.path());
    cmd
}

fn write_recipe(dir: &TempDir, content: &str) {
    fs::write(dir.path().join("tasktree.yaml"), content).unwrap();
}

const RECIPE: &str = r#"
build:
  desc: Concatenate the sources
  cmd: mkdir -p target && cat src/*.txt > target/out
  inputs: ["src/*.txt"]
  outputs: ["target/out"]

run:
  desc: Check the artifact
  cmd: test -f target/out
  deps: [build]
"#;

fn project_with_sources() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_recipe(&dir, RECIPE);
    fs::create_dir(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/a.txt"), "alpha\n").unwrap();
    dir
}

#[test]
fn list_prints_names_and_descriptions() {
    let dir = project_with_sources();
    tt(&dir)
        .arg("--list")
        .assert()
        .success()
        .stdout(contains("build").and(contains("Concatenate the sources")))
        .stdout(contains("run").and(contains("Check the artifact")));
}

#[test]
fn run_executes_then_reports_up_to_date() {
    let dir = project_with_sources();

    tt(&dir)
        .arg("run")
        .assert()
        .success()
        .stdout(contains("build").and(contains("never_run")));
    assert_eq!(
        fs::read_to_string(dir.path().join("target/out")).unwrap(),
        "alpha\n"
    );
    assert!(dir.path().join(".tasktree-state").exists());

    tt(&dir)
        .arg("run")
        .assert()
        .success()
        .stdout(contains("up to date"));
}

#[test]
fn dry_run_reports_the_plan_without_executing() {
    let dir = project_with_sources();

    tt(&dir)
        .args(["--dry-run", "run"])
        .assert()
        .success()
        .stdout(contains("2 to run"))
        .stdout(contains("never_run"));

    assert!(!dir.path().join("target").exists());
    assert!(!dir.path().join(".tasktree-state").exists());
}

#[test]
fn tree_shows_dependencies_with_freshness() {
    let dir = project_with_sources();
    tt(&dir).arg("run").assert().success();

    tt(&dir)
        .args(["--tree", "run"])
        .assert()
        .success()
        .stdout(contains("run [fresh]"))
        .stdout(contains("└── build [fresh]"));
}

#[test]
fn show_prints_the_normalised_definition() {
    let dir = project_with_sources();
    tt(&dir)
        .args(["--show", "build"])
        .assert()
        .success()
        .stdout(contains("task:     build"))
        .stdout(contains("inputs:   src/*.txt"))
        .stdout(contains("cat src/*.txt > target/out"));
}

#[test]
fn failing_task_exits_2() {
    let dir = TempDir::new().unwrap();
    write_recipe(
        &dir,
        r#"
boom:
  cmd: exit 7
"#,
    );

    tt(&dir)
        .arg("boom")
        .assert()
        .code(2)
        .stderr(contains("boom").and(contains("exit code 7")));
}

#[test]
fn unknown_task_exits_1() {
    let dir = project_with_sources();
    tt(&dir)
        .arg("nope")
        .assert()
        .code(1)
        .stderr(contains("unknown task `nope`"));
}

#[test]
fn recipe_errors_exit_1() {
    let dir = TempDir::new().unwrap();
    write_recipe(
        &dir,
        r#"
a:
  cmd: "true"
  deps: [b]
b:
  cmd: "true"
  deps: [a]
"#,
    );

    tt(&dir)
        .arg("a")
        .assert()
        .code(1)
        .stderr(contains("dependency cycle"));
}

#[test]
fn bad_argument_exits_1_without_running() {
    let dir = TempDir::new().unwrap();
    write_recipe(
        &dir,
        r#"
deploy:
  cmd: echo {{port}} > port.txt
  args: ["port:int"]
  outputs: ["port.txt"]
"#,
    );

    tt(&dir)
        .args(["deploy", "not-a-number"])
        .assert()
        .code(1)
        .stderr(contains("port"));
    assert!(!dir.path().join("port.txt").exists());
}

#[test]
fn arguments_bind_positionally_and_by_name() {
    let dir = TempDir::new().unwrap();
    write_recipe(
        &dir,
        r#"
greet:
  cmd: echo {{greeting}} {{name}} > greeting.txt
  args: ["greeting=hello", "name"]
  outputs: ["greeting.txt"]
"#,
    );

    tt(&dir).args(["greet", "name=world"]).assert().success();
    assert_eq!(
        fs::read_to_string(dir.path().join("greeting.txt")).unwrap(),
        "hello world\n"
    );
}

#[test]
fn init_writes_a_recipe_and_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();

    tt(&dir).arg("--init").assert().success();
    let written = fs::read_to_string(dir.path().join("tasktree.yaml")).unwrap();
    assert!(written.contains("hello:"));

    // The generated recipe is immediately usable.
    tt(&dir).arg("--list").assert().success().stdout(contains("hello"));

    tt(&dir)
        .arg("--init")
        .assert()
        .code(1)
        .stderr(contains("refusing to overwrite"));
}

#[test]
fn no_task_prints_usage_hint() {
    let dir = project_with_sources();
    tt(&dir)
        .assert()
        .code(1)
        .stderr(contains("--list"));
}

#[test]
fn explicit_file_flag_skips_discovery() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("custom.yaml"),
        "noop:\n  cmd: 'true'\n",
    )
    .unwrap();

    let other = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("tt").unwrap();
    let _ = cmd.current_dir(other.path());
    cmd.args([
        "--file",
        dir.path().join("custom.yaml").to_str().unwrap(),
        "--list",
    ])
    .assert()
    .success()
    .stdout(contains("noop"));
}

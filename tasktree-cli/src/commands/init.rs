//! `tt --init` - write a starter recipe.

use super::CliError;
use std::path::Path;
use tasktree_recipe::RECIPE_FILE_NAMES;

const TEMPLATE: &str = r#"# Task Tree recipe. Run tasks with `tt <task>`; see `tt --list`.
#
# Tasks re-run only when their definition, inputs or arguments changed.
# Other recipe files can be merged in under a namespace:
#
# import:
#   - file: build/tasks.yaml
#     as: build

hello:
  desc: Say hello
  cmd: echo hello from tasktree

# build:
#   desc: Compile the project
#   cmd: cargo build
#   inputs: ["src/**/*.rs", "Cargo.toml"]
#   outputs: ["target/debug/app"]
#
# deploy:
#   desc: Deploy a build to a host
#   deps: [build]
#   args: ["host:hostname", "port:int=22"]
#   cmd: scp -P {{port}} target/debug/app {{host}}:/srv/app
"#;

pub fn execute(file: Option<&Path>) -> Result<(), CliError> {
    let target = match file {
        Some(path) => path.to_path_buf(),
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| CliError::Usage(format!("cannot determine working directory: {e}")))?;
            for name in RECIPE_FILE_NAMES {
                if cwd.join(name).exists() {
                    return Err(CliError::Usage(format!(
                        "refusing to overwrite existing {name}"
                    )));
                }
            }
            cwd.join(RECIPE_FILE_NAMES[0])
        }
    };

    if target.exists() {
        return Err(CliError::Usage(format!(
            "refusing to overwrite existing {}",
            target.display()
        )));
    }

    std::fs::write(&target, TEMPLATE)
        .map_err(|e| CliError::Usage(format!("cannot write {}: {e}", target.display())))?;
    println!("wrote {}", display_relative(&target));
    Ok(())
}

fn display_relative(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

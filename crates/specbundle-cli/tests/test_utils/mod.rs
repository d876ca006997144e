//! Test utilities for specbundle integration tests

// Internal imports (std, crate)
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// External imports (alphabetized)
use anyhow::Context;
use tempfile::TempDir;

/// Creates a temporary directory for test outputs
pub fn create_temp_dir() -> anyhow::Result<(TempDir, PathBuf)> {
    let temp_dir = tempfile::tempdir()?;
    let temp_path = temp_dir.path().to_path_buf();
    Ok((temp_dir, temp_path))
}

/// Writes `content` to `dir/relative`, creating parent directories
pub fn write_file(dir: &Path, relative: &str, content: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Command for the built binary, isolated from the caller's token and log settings
pub fn specbundle() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_specbundle"));
    command.env_remove("GITHUB_PAT").env_remove("RUST_LOG");
    command
}

/// Runs the binary with `args`
pub fn run(args: &[&str]) -> anyhow::Result<Output> {
    specbundle()
        .args(args)
        .output()
        .context("Failed to execute specbundle")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// A minimal plan file whose bundle lives under `internal/demo/<version>`
pub fn create_demo_plan(dir: &Path) -> anyhow::Result<PathBuf> {
    write_file(
        dir,
        "demo-plan.yaml",
        r##"
api: demo
output_dir: internal/demo
version: "2024-01-01"
revision: abc123
steps:
  - description: Common definitions
    repository: sweater-comb
    path: components/common.yaml
    revision: main
    destination: common/common.yaml
    wrap: [components]
  - description: Demo spec
    repository: demo-service
    path: "src/{version}/spec.yaml"
    destination: spec.yaml
    rewrites:
      - search: "#/components/x-snyk-common"
        replace: "./common/common.yaml#/components"
"##,
    )
}

//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const CONFIG: &str = r#"[github]
owner = "acme"
name = "widgets"

[release]
representative_npm_package = "@acme/core"
"#;

/// A project checkout with git history
pub struct TestProject {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestProject {
  /// Git repository on `main` with a root package.json
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;

    std::fs::write(
      path.join("package.json"),
      "{\n  \"name\": \"acme-workspace\",\n  \"version\": \"13.1.0-next.0\"\n}\n",
    )?;
    std::fs::write(path.join("CHANGELOG.md"), "")?;

    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "build: initial project setup"])?;

    Ok(Self { _root: root, path })
  }

  /// Same as [`TestProject::new`] plus a committed release-train.toml
  pub fn configured() -> Result<Self> {
    let project = Self::new()?;
    project.write_file("release-train.toml", CONFIG)?;
    project.commit("build: add release configuration")?;
    Ok(project)
  }

  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    let file_path = self.path.join(path);
    if let Some(parent) = file_path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file_path, content)?;
    Ok(())
  }

  /// Commit current changes
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", message])?;

    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run the release-train binary, returning its output whatever the exit status
pub fn run_release_train(cwd: &Path, args: &[&str]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_release-train");

  Command::new(bin)
    .current_dir(cwd)
    .args(args)
    .env_remove("RELEASE_TRAIN_LOG")
    .output()
    .context("Failed to run release-train")
}

/// Run the release-train binary and fail on a non-zero exit status
pub fn run_release_train_ok(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_release_train(cwd, args)?;
  if !output.status.success() {
    anyhow::bail!(
      "release-train {} failed\nstdout: {}\nstderr: {}",
      args.join(" "),
      String::from_utf8_lossy(&output.stdout),
      String::from_utf8_lossy(&output.stderr)
    );
  }
  Ok(output)
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}

//! System git backend - zero dependencies
//!
//! Every operation is a `git` subprocess run against the project clone with an
//! isolated environment, so user-level aliases and hooks cannot change what the
//! release tool observes.

use super::{GitOutput, VersionControlClient};
use crate::core::error::{GitError, RailError, RailResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variables passed through to git (everything else is cleared)
const PASSTHROUGH_ENV: [&str; 6] = [
  "PATH",
  "HOME",
  "SSH_AUTH_SOCK",
  "GIT_SSH_COMMAND",
  "XDG_CONFIG_HOME",
  "GH_TOKEN",
];

/// Git backend using system git (zero crate dependencies)
pub struct SystemGit {
  /// Working tree root
  pub(crate) work_tree: PathBuf,
  /// Upstream URL, overriding the `origin` remote
  upstream_url: Option<String>,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to get the repository metadata.
  pub fn open(path: &Path) -> RailResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(RailError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(RailError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);

    Ok(Self {
      work_tree: PathBuf::from(stdout.trim()),
      upstream_url: None,
    })
  }

  /// Fetch from and push to `url` instead of the `origin` remote
  pub fn with_upstream_url(mut self, url: impl Into<String>) -> Self {
    self.upstream_url = Some(url.into());
    self
  }

  /// Working tree root of the opened repository
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to the work tree
  /// - Clears environment variables except a credential/transport whitelist
  /// - Adds safe configuration overrides
  fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.work_tree);

    cmd.env_clear();
    for key in PASSTHROUGH_ENV {
      if let Ok(value) = std::env::var(key) {
        cmd.env(key, value);
      }
    }

    // Force safe behavior (override user config)
    cmd.arg("-c").arg("protocol.version=2");
    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");

    cmd
  }
}

impl VersionControlClient for SystemGit {
  fn run_graceful(&self, args: &[&str]) -> RailResult<GitOutput> {
    tracing::debug!(command = %args.join(" "), "git");

    let output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute git {}", args.join(" ")))?;

    Ok(GitOutput {
      stdout: String::from_utf8_lossy(&output.stdout).to_string(),
      stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      // Killed by signal has no code; treat as a failure
      status: output.status.code().unwrap_or(-1),
    })
  }

  fn repo_git_url(&self) -> RailResult<String> {
    match &self.upstream_url {
      Some(url) => Ok(url.clone()),
      None => Ok(self.run(&["remote", "get-url", "origin"])?.stdout.trim().to_string()),
    }
  }
}

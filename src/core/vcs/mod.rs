//! Version control seam
//!
//! The release pipeline only ever talks to git through [`VersionControlClient`].
//! [`SystemGit`] is the production backend; tests substitute an in-memory fake.
//! Output is never parsed beyond trimming stdout and splitting it into lines.

pub mod system_git;

use crate::core::error::{GitError, RailError, RailResult};

pub use system_git::SystemGit;

/// Captured result of a git invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
  pub stdout: String,
  pub stderr: String,
  pub status: i32,
}

impl GitOutput {
  /// Whether git exited with status 0
  pub fn success(&self) -> bool {
    self.status == 0
  }

  /// Trimmed, non-empty stdout lines
  pub fn lines(&self) -> Vec<String> {
    self
      .stdout
      .lines()
      .map(|l| l.trim().to_string())
      .filter(|l| !l.is_empty())
      .collect()
  }
}

/// Operations the release flow needs from git
pub trait VersionControlClient {
  /// Run git, returning the output regardless of exit status.
  ///
  /// Only fails when git could not be spawned at all.
  fn run_graceful(&self, args: &[&str]) -> RailResult<GitOutput>;

  /// Run git and fail on a non-zero exit status
  fn run(&self, args: &[&str]) -> RailResult<GitOutput> {
    let output = self.run_graceful(args)?;
    if !output.success() {
      return Err(RailError::Git(GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: output.stderr.trim().to_string(),
      }));
    }
    Ok(output)
  }

  /// Check out a branch or revision.
  ///
  /// With `clean_state`, any in-progress `am`, cherry-pick or rebase is aborted
  /// and the working tree hard-reset first. Returns whether the checkout succeeded.
  fn checkout(&self, branch_or_revision: &str, clean_state: bool) -> RailResult<bool> {
    if clean_state {
      self.run_graceful(&["am", "--abort"])?;
      self.run_graceful(&["cherry-pick", "--abort"])?;
      self.run_graceful(&["rebase", "--abort"])?;
      self.run_graceful(&["reset", "--hard"])?;
    }
    Ok(self.run_graceful(&["checkout", branch_or_revision])?.success())
  }

  /// Whether the working tree has changes relative to HEAD (untracked files excluded)
  fn has_uncommitted_changes(&self) -> RailResult<bool> {
    self.run_graceful(&["update-index", "-q", "--refresh"])?;
    Ok(!self.run_graceful(&["diff-index", "--quiet", "HEAD"])?.success())
  }

  /// URL used to fetch from and push to the upstream repository
  fn repo_git_url(&self) -> RailResult<String> {
    Ok(self.run(&["remote", "get-url", "origin"])?.stdout.trim().to_string())
  }

  /// Current branch name, or the HEAD SHA when detached
  fn current_branch_or_revision(&self) -> RailResult<String> {
    let branch = self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?.stdout.trim().to_string();
    if branch == "HEAD" {
      return Ok(self.run(&["rev-parse", "HEAD"])?.stdout.trim().to_string());
    }
    Ok(branch)
  }
}

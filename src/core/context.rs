//! Release context - build once, pass everywhere
//!
//! # Design
//!
//! ReleaseContext bundles the configuration and every external client a
//! release action needs. It is built once in the command layer and handed to
//! actions by reference, so tests can swap any client for an in-memory fake.
//!
//! ```text
//! commands/publish.rs:
//!   ReleaseContext { git: &SystemGit, github: &GhCli, npm: &SystemPackageManager, .. }
//!   |
//!   v
//! release/actions/*.rs:
//!   fn perform(&self, ctx: &ReleaseContext)
//! ```

use crate::core::config::RailConfig;
use crate::core::error::{RailError, RailResult};
use crate::core::prompt::Prompt;
use crate::core::vcs::VersionControlClient;
use crate::github::{CodeHostClient, RepoRef};
use crate::npm::PackageManagerClient;
use std::path::{Path, PathBuf};

/// Shared context for a single release run
pub struct ReleaseContext<'a> {
  /// Project root (local clone, absolute path)
  pub root: PathBuf,

  /// release-train.toml
  pub config: &'a RailConfig,

  pub git: &'a dyn VersionControlClient,
  pub github: &'a dyn CodeHostClient,
  pub npm: &'a dyn PackageManagerClient,
  pub prompt: &'a dyn Prompt,
}

impl<'a> ReleaseContext<'a> {
  /// Upstream repository
  pub fn upstream(&self) -> RepoRef {
    RepoRef::new(&self.config.github.owner, &self.config.github.name)
  }

  /// Registry to publish to, when overridden in config
  pub fn registry(&self) -> Option<&str> {
    self.config.release.publish_registry.as_deref()
  }

  pub fn changelog_path(&self) -> PathBuf {
    self.root.join(&self.config.release.changelog_path)
  }

  pub fn package_json_path(&self) -> PathBuf {
    self.root.join(&self.config.release.package_json_path)
  }

  /// Path relative to the project root, as passed to git
  pub fn relative<'p>(&self, path: &'p Path) -> &'p Path {
    path.strip_prefix(&self.root).unwrap_or(path)
  }

  /// Ask for confirmation; declining ends the run as aborted
  pub fn confirm_or_abort(&self, message: &str) -> RailResult<()> {
    if self.prompt.confirm(message, true)? {
      Ok(())
    } else {
      Err(RailError::UserAborted)
    }
  }
}

//! CLI commands for release-train
//!
//! - **publish**: interactive release of one of the available actions
//! - **trains**: print the active release trains and LTS lines
//! - **dist_tag**: set or delete a registry dist tag for every release package
//! - **hash**: print the integrity hash of a build output directory
//!
//! Every command except `hash` runs inside a [`Session`], which owns the
//! production clients and lends them out as a [`ReleaseContext`].

pub mod dist_tag;
pub mod hash;
pub mod publish;
pub mod trains;

pub use dist_tag::{run_dist_tag_delete, run_dist_tag_set};
pub use hash::run_hash;
pub use publish::run_publish;
pub use trains::run_trains;

use crate::core::config::RailConfig;
use crate::core::context::ReleaseContext;
use crate::core::error::RailResult;
use crate::core::prompt::TerminalPrompt;
use crate::core::vcs::SystemGit;
use crate::github::{GhCli, RepoRef};
use crate::npm::SystemPackageManager;
use std::path::{Path, PathBuf};

/// Configuration plus production clients for one invocation
pub struct Session {
  root: PathBuf,
  config: RailConfig,
  git: SystemGit,
  github: GhCli,
  npm: SystemPackageManager,
  prompt: TerminalPrompt,
}

impl Session {
  /// Open the repository containing `path` and load its configuration
  pub fn open(path: &Path) -> RailResult<Self> {
    let git = SystemGit::open(path)?;
    let root = git.work_tree().to_path_buf();
    let config = RailConfig::load(&root)?;

    let upstream = RepoRef::new(&config.github.owner, &config.github.name);
    let git = git.with_upstream_url(upstream.git_url(config.github.use_ssh));
    let npm = SystemPackageManager::new(&root, config.package_manager.clone());
    tracing::debug!(root = %root.display(), upstream = %config.github.slug(), "session opened");

    Ok(Self {
      github: GhCli::new(upstream),
      root,
      config,
      git,
      npm,
      prompt: TerminalPrompt,
    })
  }

  pub fn context(&self) -> ReleaseContext<'_> {
    ReleaseContext {
      root: self.root.clone(),
      config: &self.config,
      git: &self.git,
      github: &self.github,
      npm: &self.npm,
      prompt: &self.prompt,
    }
  }
}

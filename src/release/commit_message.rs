//! Commit messages created by the release tool
//!
//! These are matched verbatim when verifying release lineage, so they must not change.

use semver::Version;

/// Release commit on the publish branch
pub fn release_commit_message(version: &Version) -> String {
  format!("release: cut the v{} release", version)
}

/// `next` switched to a new train after branching off
pub fn next_branch_switch_commit_message(version: &Version) -> String {
  format!("release: switch the next branch to v{}", version)
}

/// `next` bumped to a new major
pub fn next_branch_bump_commit_message(version: &Version) -> String {
  format!("release: bump the next branch to v{}", version)
}

/// Release notes cherry-picked into `next`
pub fn changelog_cherry_pick_commit_message(version: &Version) -> String {
  format!("docs: release notes for the v{} release", version)
}

pub fn exceptional_minor_prepare_commit_message(branch: &str) -> String {
  format!("build: prepare exceptional minor branch: {}", branch)
}

//! Code host (GitHub) seam
//!
//! Every method targets the configured upstream repository unless it takes an
//! explicit [`RepoRef`]. Errors are [`ApiError`]s carrying the HTTP status so
//! call sites can tell a transient rejection from bad credentials.

pub mod gh_cli;

use crate::core::error::ApiError;
use serde::{Deserialize, Serialize};

pub use gh_cli::GhCli;

pub type ApiResult<T> = Result<T, ApiError>;

/// `owner/name` of a repository (upstream or fork)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
  pub owner: String,
  pub name: String,
}

impl RepoRef {
  pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      owner: owner.into(),
      name: name.into(),
    }
  }

  /// Clone URL for the repository
  pub fn git_url(&self, use_ssh: bool) -> String {
    if use_ssh {
      format!("git@github.com:{}/{}.git", self.owner, self.name)
    } else {
      format!("https://github.com/{}/{}.git", self.owner, self.name)
    }
  }
}

/// A commit as reported by the code host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
  pub sha: String,
  pub message: String,
  /// Parent SHAs, first parent first
  pub parents: Vec<String>,
}

/// Branch head lookup result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
  pub name: String,
  pub commit: CommitSummary,
}

/// Combined result of commit statuses and check runs for a ref
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinedStatus {
  Passing,
  Pending,
  Failing,
  /// No statuses or checks reported at all
  Missing,
}

/// Individual status/check outcome fed into [`CombinedStatus::combine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
  Success,
  Pending,
  Failure,
}

impl CombinedStatus {
  /// Any failure fails the ref; otherwise any pending keeps it pending
  pub fn combine(outcomes: impl IntoIterator<Item = StatusOutcome>) -> Self {
    let mut seen = false;
    let mut pending = false;
    for outcome in outcomes {
      seen = true;
      match outcome {
        StatusOutcome::Failure => return CombinedStatus::Failing,
        StatusOutcome::Pending => pending = true,
        StatusOutcome::Success => {}
      }
    }
    match (seen, pending) {
      (false, _) => CombinedStatus::Missing,
      (true, true) => CombinedStatus::Pending,
      (true, false) => CombinedStatus::Passing,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
  /// `fork-owner:branch`
  pub head: String,
  pub base: String,
  pub title: String,
  pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSummary {
  pub number: u64,
  pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestState {
  pub merged: bool,
  /// "open" or "closed"
  pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
  pub merged: bool,
  pub message: String,
}

/// Timeline event of an issue or pull request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueEvent {
  pub event: String,
  #[serde(default)]
  pub commit_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
  pub tag_name: String,
  pub name: String,
  pub body: String,
  pub prerelease: bool,
  pub make_latest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEntry {
  pub id: u64,
  pub tag_name: String,
  pub prerelease: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseUpdate {
  pub prerelease: Option<bool>,
  pub make_latest: Option<bool>,
}

/// Operations the release flow needs from the code host
pub trait CodeHostClient {
  /// Names of all branches in the upstream repository
  fn list_branches(&self) -> ApiResult<Vec<String>>;

  fn get_branch(&self, branch: &str) -> ApiResult<BranchInfo>;

  /// Raw file contents at a ref
  fn get_file_contents(&self, path: &str, reference: &str) -> ApiResult<String>;

  fn get_commit(&self, sha: &str) -> ApiResult<CommitSummary>;

  fn get_combined_status(&self, sha: &str) -> ApiResult<CombinedStatus>;

  fn create_pull_request(&self, request: &NewPullRequest) -> ApiResult<PullRequestSummary>;

  fn add_labels(&self, number: u64, labels: &[String]) -> ApiResult<()>;

  fn get_pull_request(&self, number: u64) -> ApiResult<PullRequestState>;

  fn merge_pull_request(&self, number: u64, merge_method: &str) -> ApiResult<MergeResult>;

  /// All timeline events of an issue/PR, oldest first
  fn list_issue_events(&self, number: u64) -> ApiResult<Vec<IssueEvent>>;

  /// Fork of the upstream repository owned by the authenticated user
  fn get_fork_of_authenticated_user(&self) -> ApiResult<Option<RepoRef>>;

  fn branch_exists(&self, repo: &RepoRef, branch: &str) -> ApiResult<bool>;

  /// Create `refs/tags/<tag>` pointing at `sha`
  fn create_tag_ref(&self, tag: &str, sha: &str) -> ApiResult<()>;

  fn create_release(&self, release: &NewRelease) -> ApiResult<()>;

  fn get_release_by_tag(&self, tag: &str) -> ApiResult<ReleaseEntry>;

  fn update_release(&self, id: u64, update: &ReleaseUpdate) -> ApiResult<()>;
}

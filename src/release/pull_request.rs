//! Release pull requests and the merge gate

use crate::core::error::{RailError, RailResult, check_unauthorized};
use crate::github::{CodeHostClient, RepoRef};
use regex::Regex;
use std::thread;
use std::time::Duration;

/// Pull request opened from the caretaker's fork
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
  pub id: u64,
  pub url: String,
  pub fork: RepoRef,
  pub fork_branch: String,
}

/// Whether the PR is merged, either directly or closed by a commit that references it
pub fn is_pull_request_merged(github: &dyn CodeHostClient, id: u64) -> RailResult<bool> {
  let pr = github.get_pull_request(id).map_err(check_unauthorized)?;
  if pr.merged {
    return Ok(true);
  }
  is_pull_request_closed_with_associated_commit(github, id)
}

/// Walk the timeline from the most recent event back to the last `reopened`
fn is_pull_request_closed_with_associated_commit(github: &dyn CodeHostClient, id: u64) -> RailResult<bool> {
  let events = github.list_issue_events(id).map_err(check_unauthorized)?;

  for event in events.iter().rev() {
    if event.event == "reopened" {
      return Ok(false);
    }
    if event.event == "closed" && event.commit_id.is_none() {
      return Ok(false);
    }
    if let Some(sha) = &event.commit_id
      && is_commit_closing_pull_request(github, sha, id)?
    {
      return Ok(true);
    }
  }
  Ok(false)
}

fn is_commit_closing_pull_request(github: &dyn CodeHostClient, sha: &str, id: u64) -> RailResult<bool> {
  let commit = github.get_commit(sha).map_err(check_unauthorized)?;
  Ok(closes_pull_request(&commit.message, id))
}

/// `closes #<id>`, `fixed #<id>`, `resolves: #<id>`, ... (not followed by another digit)
pub fn closes_pull_request(message: &str, id: u64) -> bool {
  let pattern = format!(r"(?i)(?:close[sd]?|fix(?:e[sd]?)|resolve[sd]?):? #{}(?:\D|$)", id);
  Regex::new(&pattern).is_ok_and(|re| re.is_match(message))
}

/// Block until the PR is merged, attempting a merge through the API on every iteration.
///
/// Rejections from the code host (4xx) are logged and retried; bad credentials
/// end the run. There is no upper bound on the wait.
pub fn wait_for_pull_request_merged(
  github: &dyn CodeHostClient,
  pr: &PullRequest,
  merge_method: &str,
  poll_interval: Duration,
) -> RailResult<()> {
  println!("⏳ Waiting for pull request #{} to be merged: {}", pr.id, pr.url);

  loop {
    if is_pull_request_merged(github, pr.id)? {
      println!("   ✓ Pull request #{} has been merged", pr.id);
      return Ok(());
    }

    match github.merge_pull_request(pr.id, merge_method) {
      Ok(result) if result.merged => {
        println!("   ✓ Merged pull request #{}", pr.id);
        return Ok(());
      }
      Ok(result) => {
        tracing::debug!(pr = pr.id, message = %result.message, "merge not completed");
      }
      Err(e) if e.is_unauthorized() => return Err(check_unauthorized(e)),
      Err(e) if e.is_client_error() => {
        tracing::warn!(pr = pr.id, status = e.status, "merge attempt rejected: {}", e.message);
      }
      Err(e) => return Err(RailError::CodeHost(e)),
    }

    thread::sleep(poll_interval);
  }
}

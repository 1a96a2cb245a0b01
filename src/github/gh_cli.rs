//! GitHub REST access via the `gh` CLI
//!
//! Authentication, host configuration and retries on transport errors are left
//! to `gh`. Requests are `gh api` invocations; JSON bodies go through stdin.

use super::{
  ApiResult, BranchInfo, CodeHostClient, CombinedStatus, CommitSummary, IssueEvent, MergeResult, NewPullRequest,
  NewRelease, PullRequestState, PullRequestSummary, ReleaseEntry, ReleaseUpdate, RepoRef, StatusOutcome,
};
use crate::core::error::ApiError;
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

/// `gh api` client bound to one upstream repository
pub struct GhCli {
  upstream: RepoRef,
  bin: String,
}

impl GhCli {
  pub fn new(upstream: RepoRef) -> Self {
    Self {
      upstream,
      bin: "gh".to_string(),
    }
  }

  fn repo_path(&self, suffix: &str) -> String {
    format!("repos/{}/{}/{}", self.upstream.owner, self.upstream.name, suffix)
  }

  /// Run `gh api` and return raw stdout
  fn request(&self, method: &str, endpoint: &str, body: Option<&Value>, extra: &[&str]) -> ApiResult<String> {
    tracing::debug!(%method, %endpoint, "gh api");

    let mut cmd = Command::new(&self.bin);
    cmd.args(["api", "-X", method, endpoint]).args(extra);
    if body.is_some() {
      cmd.args(["--input", "-"]);
    }
    cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = cmd
      .spawn()
      .map_err(|e| ApiError::new(0, format!("Failed to run `{}`: {}", self.bin, e)))?;

    if let Some(body) = body
      && let Some(mut stdin) = child.stdin.take()
    {
      stdin
        .write_all(body.to_string().as_bytes())
        .map_err(|e| ApiError::new(0, format!("Failed to send request body: {}", e)))?;
    }

    let output = child
      .wait_with_output()
      .map_err(|e| ApiError::new(0, format!("Failed to wait for `{}`: {}", self.bin, e)))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(parse_api_error(&stderr));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }

  fn json<T: DeserializeOwned>(&self, method: &str, endpoint: &str, body: Option<&Value>) -> ApiResult<T> {
    let stdout = self.request(method, endpoint, body, &[])?;
    decode(&stdout)
  }

  /// GET every page of a list endpoint
  fn paginated<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<Vec<T>> {
    let stdout = self.request("GET", endpoint, None, &["--paginate", "--slurp"])?;
    let pages: Vec<Vec<T>> = decode(&stdout)?;
    Ok(pages.into_iter().flatten().collect())
  }

  fn send(&self, method: &str, endpoint: &str, body: &Value) -> ApiResult<()> {
    self.request(method, endpoint, Some(body), &[]).map(|_| ())
  }
}

fn decode<T: DeserializeOwned>(stdout: &str) -> ApiResult<T> {
  serde_json::from_str(stdout).map_err(|e| ApiError::new(0, format!("Unexpected GitHub response: {}", e)))
}

/// Extract the HTTP status `gh` prints as `... (HTTP 404)`
fn parse_api_error(stderr: &str) -> ApiError {
  static STATUS: OnceLock<Regex> = OnceLock::new();
  let re = STATUS.get_or_init(|| Regex::new(r"\(HTTP (\d{3})\)").expect("valid regex"));

  let status = re
    .captures(stderr)
    .and_then(|c| c.get(1))
    .and_then(|m| m.as_str().parse().ok())
    .unwrap_or(0);
  let message = stderr
    .lines()
    .find(|l| !l.trim().is_empty())
    .unwrap_or("unknown error")
    .trim_start_matches("gh: ")
    .trim()
    .to_string();

  ApiError::new(status, message)
}

#[derive(Deserialize)]
struct RawSha {
  sha: String,
}

#[derive(Deserialize)]
struct RawCommitDetail {
  message: String,
}

#[derive(Deserialize)]
struct RawCommit {
  sha: String,
  commit: RawCommitDetail,
  #[serde(default)]
  parents: Vec<RawSha>,
}

impl From<RawCommit> for CommitSummary {
  fn from(raw: RawCommit) -> Self {
    Self {
      sha: raw.sha,
      message: raw.commit.message,
      parents: raw.parents.into_iter().map(|p| p.sha).collect(),
    }
  }
}

#[derive(Deserialize)]
struct RawBranch {
  name: String,
  commit: RawCommit,
}

#[derive(Deserialize)]
struct RawBranchName {
  name: String,
}

#[derive(Deserialize)]
struct RawStatus {
  state: String,
}

#[derive(Deserialize)]
struct RawCombinedStatus {
  #[serde(default)]
  statuses: Vec<RawStatus>,
}

#[derive(Deserialize)]
struct RawCheckRun {
  status: String,
  #[serde(default)]
  conclusion: Option<String>,
}

#[derive(Deserialize)]
struct RawCheckRuns {
  #[serde(default)]
  check_runs: Vec<RawCheckRun>,
}

#[derive(Deserialize)]
struct RawPullRequest {
  number: u64,
  html_url: String,
}

#[derive(Deserialize)]
struct RawPullRequestState {
  #[serde(default)]
  merged: bool,
  state: String,
}

#[derive(Deserialize)]
struct RawMerge {
  #[serde(default)]
  merged: bool,
  #[serde(default)]
  message: String,
}

#[derive(Deserialize)]
struct RawUser {
  login: String,
}

#[derive(Deserialize)]
struct RawRepoParent {
  full_name: String,
}

#[derive(Deserialize)]
struct RawRepo {
  name: String,
  owner: RawUser,
  #[serde(default)]
  fork: bool,
  #[serde(default)]
  parent: Option<RawRepoParent>,
}

#[derive(Deserialize)]
struct RawRelease {
  id: u64,
  tag_name: String,
  #[serde(default)]
  prerelease: bool,
}

fn status_outcome(state: &str) -> StatusOutcome {
  match state {
    "success" => StatusOutcome::Success,
    "pending" => StatusOutcome::Pending,
    _ => StatusOutcome::Failure,
  }
}

fn check_run_outcome(run: &RawCheckRun) -> StatusOutcome {
  if run.status != "completed" {
    return StatusOutcome::Pending;
  }
  match run.conclusion.as_deref() {
    Some("success") | Some("neutral") | Some("skipped") => StatusOutcome::Success,
    _ => StatusOutcome::Failure,
  }
}

impl CodeHostClient for GhCli {
  fn list_branches(&self) -> ApiResult<Vec<String>> {
    let branches: Vec<RawBranchName> = self.paginated(&self.repo_path("branches?per_page=100"))?;
    Ok(branches.into_iter().map(|b| b.name).collect())
  }

  fn get_branch(&self, branch: &str) -> ApiResult<BranchInfo> {
    let raw: RawBranch = self.json("GET", &self.repo_path(&format!("branches/{}", branch)), None)?;
    Ok(BranchInfo {
      name: raw.name,
      commit: raw.commit.into(),
    })
  }

  fn get_file_contents(&self, path: &str, reference: &str) -> ApiResult<String> {
    self.request(
      "GET",
      &self.repo_path(&format!("contents/{}?ref={}", path, reference)),
      None,
      &["-H", "Accept: application/vnd.github.raw+json"],
    )
  }

  fn get_commit(&self, sha: &str) -> ApiResult<CommitSummary> {
    let raw: RawCommit = self.json("GET", &self.repo_path(&format!("commits/{}", sha)), None)?;
    Ok(raw.into())
  }

  fn get_combined_status(&self, sha: &str) -> ApiResult<CombinedStatus> {
    let statuses: RawCombinedStatus = self.json("GET", &self.repo_path(&format!("commits/{}/status", sha)), None)?;
    let checks: RawCheckRuns = self.json(
      "GET",
      &self.repo_path(&format!("commits/{}/check-runs?per_page=100", sha)),
      None,
    )?;

    let outcomes = statuses
      .statuses
      .iter()
      .map(|s| status_outcome(&s.state))
      .chain(checks.check_runs.iter().map(check_run_outcome));

    Ok(CombinedStatus::combine(outcomes))
  }

  fn create_pull_request(&self, request: &NewPullRequest) -> ApiResult<PullRequestSummary> {
    let body = json!({
      "head": request.head,
      "base": request.base,
      "title": request.title,
      "body": request.body,
    });
    let raw: RawPullRequest = self.json("POST", &self.repo_path("pulls"), Some(&body))?;
    Ok(PullRequestSummary {
      number: raw.number,
      html_url: raw.html_url,
    })
  }

  fn add_labels(&self, number: u64, labels: &[String]) -> ApiResult<()> {
    self.send(
      "POST",
      &self.repo_path(&format!("issues/{}/labels", number)),
      &json!({ "labels": labels }),
    )
  }

  fn get_pull_request(&self, number: u64) -> ApiResult<PullRequestState> {
    let raw: RawPullRequestState = self.json("GET", &self.repo_path(&format!("pulls/{}", number)), None)?;
    Ok(PullRequestState {
      merged: raw.merged,
      state: raw.state,
    })
  }

  fn merge_pull_request(&self, number: u64, merge_method: &str) -> ApiResult<MergeResult> {
    let raw: RawMerge = self.json(
      "PUT",
      &self.repo_path(&format!("pulls/{}/merge", number)),
      Some(&json!({ "merge_method": merge_method })),
    )?;
    Ok(MergeResult {
      merged: raw.merged,
      message: raw.message,
    })
  }

  fn list_issue_events(&self, number: u64) -> ApiResult<Vec<IssueEvent>> {
    self.paginated(&self.repo_path(&format!("issues/{}/events?per_page=100", number)))
  }

  fn get_fork_of_authenticated_user(&self) -> ApiResult<Option<RepoRef>> {
    let user: RawUser = self.json("GET", "user", None)?;
    let repo: RawRepo = match self.json("GET", &format!("repos/{}/{}", user.login, self.upstream.name), None) {
      Ok(repo) => repo,
      Err(e) if e.is_not_found() => return Ok(None),
      Err(e) => return Err(e),
    };

    let upstream = format!("{}/{}", self.upstream.owner, self.upstream.name);
    let is_fork_of_upstream = repo.fork && repo.parent.is_some_and(|p| p.full_name.eq_ignore_ascii_case(&upstream));
    if !is_fork_of_upstream {
      return Ok(None);
    }

    Ok(Some(RepoRef::new(repo.owner.login, repo.name)))
  }

  fn branch_exists(&self, repo: &RepoRef, branch: &str) -> ApiResult<bool> {
    let endpoint = format!("repos/{}/{}/branches/{}", repo.owner, repo.name, branch);
    match self.request("GET", &endpoint, None, &[]) {
      Ok(_) => Ok(true),
      Err(e) if e.is_not_found() => Ok(false),
      Err(e) => Err(e),
    }
  }

  fn create_tag_ref(&self, tag: &str, sha: &str) -> ApiResult<()> {
    self.send(
      "POST",
      &self.repo_path("git/refs"),
      &json!({ "ref": format!("refs/tags/{}", tag), "sha": sha }),
    )
  }

  fn create_release(&self, release: &NewRelease) -> ApiResult<()> {
    self.send(
      "POST",
      &self.repo_path("releases"),
      &json!({
        "tag_name": release.tag_name,
        "name": release.name,
        "body": release.body,
        "prerelease": release.prerelease,
        "make_latest": if release.make_latest { "true" } else { "false" },
      }),
    )
  }

  fn get_release_by_tag(&self, tag: &str) -> ApiResult<ReleaseEntry> {
    let raw: RawRelease = self.json("GET", &self.repo_path(&format!("releases/tags/{}", tag)), None)?;
    Ok(ReleaseEntry {
      id: raw.id,
      tag_name: raw.tag_name,
      prerelease: raw.prerelease,
    })
  }

  fn update_release(&self, id: u64, update: &ReleaseUpdate) -> ApiResult<()> {
    let mut body = serde_json::Map::new();
    if let Some(prerelease) = update.prerelease {
      body.insert("prerelease".to_string(), Value::Bool(prerelease));
    }
    if let Some(make_latest) = update.make_latest {
      body.insert(
        "make_latest".to_string(),
        Value::String(if make_latest { "true" } else { "false" }.to_string()),
      );
    }
    self.send("PATCH", &self.repo_path(&format!("releases/{}", id)), &Value::Object(body))
  }
}

//! In-memory fakes of every external client, for unit tests

use crate::core::config::RailConfig;
use crate::core::context::ReleaseContext;
use crate::core::error::{ApiError, RailError, RailResult};
use crate::core::prompt::Prompt;
use crate::core::vcs::{GitOutput, VersionControlClient};
use crate::github::{
  ApiResult, BranchInfo, CodeHostClient, CombinedStatus, CommitSummary, IssueEvent, MergeResult, NewPullRequest,
  NewRelease, PullRequestState, PullRequestSummary, ReleaseEntry, ReleaseUpdate, RepoRef,
};
use crate::npm::{BuiltPackage, NpmPackage, PackageManagerClient, PrecheckPayload, RegistryPackageInfo};
use crate::versioning::experimental::create_experimental_semver;
use semver::Version;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TEST_CONFIG: &str = r#"
[github]
owner = "acme"
name = "widgets"

[release]
representative_npm_package = "@acme/core"
release_pr_labels = ["release"]
merge_poll_interval_secs = 0
"#;

pub fn test_config() -> RailConfig {
  RailConfig::parse(TEST_CONFIG).unwrap()
}

/// Git fake recording every invocation
#[derive(Default)]
pub struct FakeGit {
  calls: RefCell<Vec<String>>,
  failing: RefCell<Vec<String>>,
  stdout: RefCell<Vec<(String, String)>>,
}

impl FakeGit {
  /// Invocations starting with `prefix` print `stdout`
  pub fn respond(&self, prefix: &str, stdout: &str) {
    self.stdout.borrow_mut().push((prefix.to_string(), stdout.to_string()));
  }

  /// Invocations starting with `prefix` exit with status 1
  pub fn fail(&self, prefix: &str) {
    self.failing.borrow_mut().push(prefix.to_string());
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.borrow().clone()
  }
}

impl VersionControlClient for FakeGit {
  fn run_graceful(&self, args: &[&str]) -> RailResult<GitOutput> {
    let joined = args.join(" ");
    self.calls.borrow_mut().push(joined.clone());
    let failed = self.failing.borrow().iter().any(|p| joined.starts_with(p));
    let stdout = self
      .stdout
      .borrow()
      .iter()
      .find(|(p, _)| joined.starts_with(p.as_str()))
      .map(|(_, out)| out.clone())
      .unwrap_or_default();
    Ok(GitOutput {
      stdout,
      stderr: if failed { "fatal: simulated".to_string() } else { String::new() },
      status: if failed { 1 } else { 0 },
    })
  }

  fn repo_git_url(&self) -> RailResult<String> {
    Ok("https://github.com/acme/widgets.git".to_string())
  }
}

/// Code host fake with scripted responses
#[derive(Default)]
pub struct FakeCodeHost {
  branches: RefCell<Vec<String>>,
  files: RefCell<HashMap<(String, String), String>>,
  heads: RefCell<HashMap<String, VecDeque<CommitSummary>>>,
  lookups: RefCell<HashMap<String, usize>>,
  commits: RefCell<HashMap<String, CommitSummary>>,
  status: Cell<Option<CombinedStatus>>,
  merge_responses: RefCell<VecDeque<ApiResult<MergeResult>>>,
  merge_attempts: Cell<usize>,
  events: RefCell<Vec<IssueEvent>>,
  no_fork: Cell<bool>,
  fork_branches: RefCell<HashSet<String>>,
  pull_requests: RefCell<Vec<NewPullRequest>>,
  labels: RefCell<Vec<(u64, Vec<String>)>>,
  tags: RefCell<Vec<(String, String)>>,
  releases: RefCell<Vec<NewRelease>>,
  release_updates: RefCell<Vec<(u64, ReleaseUpdate)>>,
}

impl FakeCodeHost {
  fn set_package_json(&self, branch: &str, contents: String) {
    if !self.branches.borrow().iter().any(|b| b == branch) {
      self.branches.borrow_mut().push(branch.to_string());
    }
    self
      .files
      .borrow_mut()
      .insert(("package.json".to_string(), branch.to_string()), contents);
  }

  pub fn set_branch_version(&self, branch: &str, version: &str) {
    self.set_package_json(branch, format!("{{\"name\":\"acme-workspace\",\"version\":\"{}\"}}", version));
  }

  pub fn set_exceptional_minor(&self, branch: &str, version: &str) {
    self.set_package_json(
      branch,
      format!(
        "{{\"name\":\"acme-workspace\",\"version\":\"{}\",\"__exceptionalMinor__\":true}}",
        version
      ),
    );
  }

  pub fn set_branch_head(&self, branch: &str, commit: CommitSummary) {
    self.queue_branch_heads(branch, vec![commit]);
  }

  /// Successive `get_branch` calls return these heads; the last one repeats
  pub fn queue_branch_heads(&self, branch: &str, commits: Vec<CommitSummary>) {
    self.heads.borrow_mut().insert(branch.to_string(), commits.into());
  }

  pub fn branch_lookups(&self, branch: &str) -> usize {
    self.lookups.borrow().get(branch).copied().unwrap_or(0)
  }

  pub fn add_commit(&self, sha: &str, message: &str, parents: &[&str]) {
    self.commits.borrow_mut().insert(
      sha.to_string(),
      CommitSummary {
        sha: sha.to_string(),
        message: message.to_string(),
        parents: parents.iter().map(|p| p.to_string()).collect(),
      },
    );
  }

  pub fn set_status(&self, status: CombinedStatus) {
    self.status.set(Some(status));
  }

  pub fn queue_merge_response(&self, response: ApiResult<MergeResult>) {
    self.merge_responses.borrow_mut().push_back(response);
  }

  pub fn merge_attempts(&self) -> usize {
    self.merge_attempts.get()
  }

  pub fn set_issue_events(&self, events: Vec<IssueEvent>) {
    *self.events.borrow_mut() = events;
  }

  pub fn remove_fork(&self) {
    self.no_fork.set(true);
  }

  pub fn add_fork_branch(&self, branch: &str) {
    self.fork_branches.borrow_mut().insert(branch.to_string());
  }

  pub fn pull_requests(&self) -> Vec<NewPullRequest> {
    self.pull_requests.borrow().clone()
  }

  pub fn labels(&self) -> Vec<(u64, Vec<String>)> {
    self.labels.borrow().clone()
  }

  pub fn tags(&self) -> Vec<(String, String)> {
    self.tags.borrow().clone()
  }

  pub fn releases(&self) -> Vec<NewRelease> {
    self.releases.borrow().clone()
  }

  pub fn release_updates(&self) -> Vec<(u64, ReleaseUpdate)> {
    self.release_updates.borrow().clone()
  }
}

impl CodeHostClient for FakeCodeHost {
  fn list_branches(&self) -> ApiResult<Vec<String>> {
    Ok(self.branches.borrow().clone())
  }

  fn get_branch(&self, branch: &str) -> ApiResult<BranchInfo> {
    *self.lookups.borrow_mut().entry(branch.to_string()).or_default() += 1;

    let mut heads = self.heads.borrow_mut();
    let commit = match heads.get_mut(branch) {
      Some(queue) if queue.len() > 1 => queue.pop_front(),
      Some(queue) => queue.front().cloned(),
      None => None,
    }
    .unwrap_or_else(|| CommitSummary {
      sha: format!("{}-head", branch),
      message: String::new(),
      parents: vec![],
    });

    Ok(BranchInfo {
      name: branch.to_string(),
      commit,
    })
  }

  fn get_file_contents(&self, path: &str, reference: &str) -> ApiResult<String> {
    self
      .files
      .borrow()
      .get(&(path.to_string(), reference.to_string()))
      .cloned()
      .ok_or_else(|| ApiError::new(404, "Not Found"))
  }

  fn get_commit(&self, sha: &str) -> ApiResult<CommitSummary> {
    self
      .commits
      .borrow()
      .get(sha)
      .cloned()
      .ok_or_else(|| ApiError::new(404, "No commit found"))
  }

  fn get_combined_status(&self, _sha: &str) -> ApiResult<CombinedStatus> {
    Ok(self.status.get().unwrap_or(CombinedStatus::Passing))
  }

  fn create_pull_request(&self, request: &NewPullRequest) -> ApiResult<PullRequestSummary> {
    let mut prs = self.pull_requests.borrow_mut();
    prs.push(request.clone());
    let number = 100 + prs.len() as u64;
    Ok(PullRequestSummary {
      number,
      html_url: format!("https://github.com/acme/widgets/pull/{}", number),
    })
  }

  fn add_labels(&self, number: u64, labels: &[String]) -> ApiResult<()> {
    self.labels.borrow_mut().push((number, labels.to_vec()));
    Ok(())
  }

  fn get_pull_request(&self, _number: u64) -> ApiResult<PullRequestState> {
    Ok(PullRequestState {
      merged: false,
      state: "open".to_string(),
    })
  }

  fn merge_pull_request(&self, _number: u64, _merge_method: &str) -> ApiResult<MergeResult> {
    self.merge_attempts.set(self.merge_attempts.get() + 1);
    self.merge_responses.borrow_mut().pop_front().unwrap_or_else(|| {
      Ok(MergeResult {
        merged: true,
        message: "Pull Request successfully merged".to_string(),
      })
    })
  }

  fn list_issue_events(&self, _number: u64) -> ApiResult<Vec<IssueEvent>> {
    Ok(self.events.borrow().clone())
  }

  fn get_fork_of_authenticated_user(&self) -> ApiResult<Option<RepoRef>> {
    if self.no_fork.get() {
      return Ok(None);
    }
    Ok(Some(RepoRef::new("caretaker", "widgets")))
  }

  fn branch_exists(&self, _repo: &RepoRef, branch: &str) -> ApiResult<bool> {
    Ok(self.fork_branches.borrow().contains(branch))
  }

  fn create_tag_ref(&self, tag: &str, sha: &str) -> ApiResult<()> {
    self.tags.borrow_mut().push((tag.to_string(), sha.to_string()));
    Ok(())
  }

  fn create_release(&self, release: &NewRelease) -> ApiResult<()> {
    self.releases.borrow_mut().push(release.clone());
    Ok(())
  }

  fn get_release_by_tag(&self, tag: &str) -> ApiResult<ReleaseEntry> {
    Ok(ReleaseEntry {
      id: 99,
      tag_name: tag.to_string(),
      prerelease: true,
    })
  }

  fn update_release(&self, id: u64, update: &ReleaseUpdate) -> ApiResult<()> {
    self.release_updates.borrow_mut().push((id, update.clone()));
    Ok(())
  }
}

/// Package manager fake; `build` writes one output directory per known package
/// using the version of the root package.json
pub struct FakePackageManager {
  root: PathBuf,
  info: RefCell<Vec<NpmPackage>>,
  registry: RefCell<RegistryPackageInfo>,
  calls: RefCell<Vec<String>>,
  prechecks: RefCell<Vec<String>>,
  published: RefCell<Vec<(String, String)>>,
  dist_tags: RefCell<Vec<(String, String, String)>>,
  deleted_tags: RefCell<Vec<(String, String)>>,
  logged_in: Cell<bool>,
}

impl FakePackageManager {
  pub fn new(root: &Path) -> Self {
    Self {
      root: root.to_path_buf(),
      info: RefCell::new(vec![NpmPackage {
        name: "@acme/core".to_string(),
        experimental: false,
      }]),
      registry: RefCell::new(RegistryPackageInfo::default()),
      calls: RefCell::new(Vec::new()),
      prechecks: RefCell::new(Vec::new()),
      published: RefCell::new(Vec::new()),
      dist_tags: RefCell::new(Vec::new()),
      deleted_tags: RefCell::new(Vec::new()),
      logged_in: Cell::new(true),
    }
  }

  pub fn set_packages(&self, packages: Vec<NpmPackage>) {
    *self.info.borrow_mut() = packages;
  }

  pub fn set_registry(&self, info: RegistryPackageInfo) {
    *self.registry.borrow_mut() = info;
  }

  pub fn log_out(&self) {
    self.logged_in.set(false);
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.borrow().clone()
  }

  pub fn prechecks(&self) -> Vec<String> {
    self.prechecks.borrow().clone()
  }

  /// `(output directory name, dist tag)` in publish order
  pub fn published(&self) -> Vec<(String, String)> {
    self.published.borrow().clone()
  }

  /// `(package, tag, version)`
  pub fn dist_tags(&self) -> Vec<(String, String, String)> {
    self.dist_tags.borrow().clone()
  }

  pub fn deleted_tags(&self) -> Vec<(String, String)> {
    self.deleted_tags.borrow().clone()
  }

  fn root_version(&self) -> RailResult<Version> {
    let content = fs::read_to_string(self.root.join("package.json"))?;
    let pkg: serde_json::Value = serde_json::from_str(&content)?;
    let raw = pkg["version"].as_str().unwrap_or("0.0.0");
    Ok(Version::parse(raw)?)
  }
}

fn short_name(package: &str) -> &str {
  package.rsplit('/').next().unwrap_or(package)
}

impl PackageManagerClient for FakePackageManager {
  fn install(&self) -> RailResult<()> {
    self.calls.borrow_mut().push("install".to_string());
    Ok(())
  }

  fn build(&self) -> RailResult<Vec<BuiltPackage>> {
    self.calls.borrow_mut().push("build".to_string());
    let version = self.root_version()?;
    let mut built = Vec::new();
    for pkg in self.info.borrow().iter() {
      let pkg_version = if pkg.experimental {
        create_experimental_semver(&version)
      } else {
        version.clone()
      };
      let dir = write_package_dir(&self.root, short_name(&pkg.name), &pkg_version.to_string());
      built.push(BuiltPackage {
        name: pkg.name.clone(),
        output_path: dir,
      });
    }
    Ok(built)
  }

  fn info(&self) -> RailResult<Vec<NpmPackage>> {
    self.calls.borrow_mut().push("info".to_string());
    Ok(self.info.borrow().clone())
  }

  fn precheck(&self, payload: &PrecheckPayload<'_>) -> RailResult<()> {
    self.prechecks.borrow_mut().push(payload.new_version.clone());
    Ok(())
  }

  fn publish(&self, package_path: &Path, dist_tag: &str, _registry: Option<&str>) -> RailResult<()> {
    let name = package_path
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
      .unwrap_or_default();
    self.published.borrow_mut().push((name, dist_tag.to_string()));
    Ok(())
  }

  fn set_dist_tag(&self, package: &str, tag: &str, version: &Version, _registry: Option<&str>) -> RailResult<()> {
    self
      .dist_tags
      .borrow_mut()
      .push((package.to_string(), tag.to_string(), version.to_string()));
    Ok(())
  }

  fn delete_dist_tag(&self, package: &str, tag: &str, _registry: Option<&str>) -> RailResult<()> {
    self.deleted_tags.borrow_mut().push((package.to_string(), tag.to_string()));
    Ok(())
  }

  fn registry_info(&self, _package: &str, _registry: Option<&str>) -> RailResult<RegistryPackageInfo> {
    Ok(self.registry.borrow().clone())
  }

  fn whoami(&self, _registry: Option<&str>) -> RailResult<Option<String>> {
    Ok(self.logged_in.get().then(|| "caretaker".to_string()))
  }
}

/// Prompt fake; unanswered confirmations default to yes and selections to the first choice
#[derive(Default)]
pub struct FakePrompt {
  confirms: RefCell<VecDeque<bool>>,
  selections: RefCell<VecDeque<usize>>,
  asked: RefCell<Vec<String>>,
}

impl FakePrompt {
  pub fn answer_confirm(&self, answer: bool) {
    self.confirms.borrow_mut().push_back(answer);
  }

  pub fn answer_select(&self, index: usize) {
    self.selections.borrow_mut().push_back(index);
  }

  pub fn asked(&self) -> Vec<String> {
    self.asked.borrow().clone()
  }
}

impl Prompt for FakePrompt {
  fn confirm(&self, message: &str, _default: bool) -> RailResult<bool> {
    self.asked.borrow_mut().push(message.to_string());
    Ok(self.confirms.borrow_mut().pop_front().unwrap_or(true))
  }

  fn select(&self, message: &str, choices: &[String]) -> RailResult<usize> {
    self.asked.borrow_mut().push(message.to_string());
    let index = self.selections.borrow_mut().pop_front().unwrap_or(0);
    if index >= choices.len() {
      return Err(RailError::message("selection out of range"));
    }
    Ok(index)
  }
}

fn write_package_dir(root: &Path, name: &str, version: &str) -> PathBuf {
  let dir = root.join("dist").join(name);
  fs::create_dir_all(&dir).unwrap();
  fs::write(
    dir.join("package.json"),
    format!("{{\"name\":\"{}\",\"version\":\"{}\"}}", name, version),
  )
  .unwrap();
  fs::write(dir.join("index.js"), format!("export const version = '{}';\n", version)).unwrap();
  dir
}

/// A project directory plus fakes for every client
pub struct TestHarness {
  dir: TempDir,
  pub config: RailConfig,
  pub git: FakeGit,
  pub github: FakeCodeHost,
  pub npm: FakePackageManager,
  pub prompt: FakePrompt,
}

impl TestHarness {
  pub fn new() -> Self {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
      dir.path().join("package.json"),
      "{\"name\":\"acme-workspace\",\"version\":\"0.0.0\"}\n",
    )
    .unwrap();
    fs::write(dir.path().join("CHANGELOG.md"), "").unwrap();
    let npm = FakePackageManager::new(dir.path());

    Self {
      dir,
      config: test_config(),
      git: FakeGit::default(),
      github: FakeCodeHost::default(),
      npm,
      prompt: FakePrompt::default(),
    }
  }

  pub fn root(&self) -> &Path {
    self.dir.path()
  }

  pub fn context(&self) -> ReleaseContext<'_> {
    ReleaseContext {
      root: self.dir.path().to_path_buf(),
      config: &self.config,
      git: &self.git,
      github: &self.github,
      npm: &self.npm,
      prompt: &self.prompt,
    }
  }

  /// Build output directory `<root>/dist/<name>` carrying `version`
  pub fn write_built_package(&self, name: &str, version: &str) -> PathBuf {
    write_package_dir(self.dir.path(), name, version)
  }
}

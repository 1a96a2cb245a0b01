//! Staging and publish pipeline shared by all release actions
//!
//! Staging takes a branch from its upstream head to an open release pull
//! request: status gate, detached checkout, version bump, changelog, release
//! commit, build, precheck and a push to the caretaker's fork. Publishing
//! verifies the merged release commit and the staged build output before
//! anything is written to the registry.

use super::commit_message::{changelog_cherry_pick_commit_message, release_commit_message};
use super::integrity::{
  BuiltPackageWithInfo, analyze_and_extend_built_packages, assert_integrity, assert_matching_versions,
};
use super::notes::ReleaseNotes;
use super::pull_request::{PullRequest, wait_for_pull_request_merged};
use crate::core::context::ReleaseContext;
use crate::core::error::{GitError, RailError, RailResult, ResultExt, check_unauthorized};
use crate::github::{CombinedStatus, NewPullRequest, NewRelease, RepoRef};
use crate::npm::PrecheckPayload;
use crate::ui::progress::PackageProgress;
use chrono::Utc;
use semver::Version;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// GitHub rejects release bodies above this size
pub const MAX_GITHUB_RELEASE_BODY_LENGTH: usize = 25_000;

/// Variant-specific `package.json` edit applied while staging
pub type PackageJsonMutator = fn(&mut Map<String, Value>);

#[derive(Default, Clone, Copy)]
pub struct StagingOptions {
  pub update_pkg_json: Option<PackageJsonMutator>,
}

/// Output of a staging run, consumed by [`ReleasePipeline::publish`]
#[derive(Debug, Clone)]
pub struct StagingResult {
  pub release_notes: ReleaseNotes,
  pub pull_request: PullRequest,
  pub built_packages: Vec<BuiltPackageWithInfo>,
  /// Upstream head of the staged branch before the release commit
  pub before_staging_sha: String,
}

/// How a staged release is published
#[derive(Debug, Clone)]
pub struct PublishOptions<'t> {
  pub npm_dist_tag: &'t str,
  /// Mark the GitHub release as latest
  pub make_latest: bool,
}

/// Pipeline primitives bound to a release context
pub struct ReleasePipeline<'c, 'a> {
  ctx: &'c ReleaseContext<'a>,
}

impl<'c, 'a> ReleasePipeline<'c, 'a> {
  pub fn new(ctx: &'c ReleaseContext<'a>) -> Self {
    Self { ctx }
  }

  fn upstream_url(&self) -> RailResult<String> {
    self.ctx.git.repo_git_url()
  }

  /// Head SHA of an upstream branch
  pub fn get_latest_commit_of_branch(&self, branch: &str) -> RailResult<String> {
    let info = self.ctx.github.get_branch(branch).map_err(check_unauthorized)?;
    Ok(info.commit.sha)
  }

  /// Gate on the combined GitHub status of `sha`; an override needs explicit confirmation
  pub fn assert_passing_github_status(&self, sha: &str, branch: &str) -> RailResult<()> {
    let status = self.ctx.github.get_combined_status(sha).map_err(check_unauthorized)?;
    let short = &sha[..sha.len().min(7)];

    let problem = match status {
      CombinedStatus::Passing => {
        println!("   ✓ Upstream commit {} of \"{}\" is passing all GitHub checks", short, branch);
        return Ok(());
      }
      CombinedStatus::Pending => "still has pending GitHub checks",
      CombinedStatus::Failing => "is failing GitHub checks",
      CombinedStatus::Missing => "has no GitHub checks reported",
    };

    println!("⚠️  Upstream commit {} of \"{}\" {}.", short, branch, problem);
    if !self
      .ctx
      .prompt
      .confirm("Do you want to ignore the GitHub status and proceed?", false)?
    {
      return Err(RailError::UserAborted);
    }
    tracing::warn!(branch, sha, ?status, "proceeding despite GitHub status");
    Ok(())
  }

  /// Fetch an upstream branch and check out its head detached
  pub fn checkout_upstream_branch(&self, branch: &str) -> RailResult<()> {
    let url = self.upstream_url()?;
    self.ctx.git.run(&["fetch", "-q", &url, branch])?;
    self.ctx.git.run(&["checkout", "-q", "FETCH_HEAD", "--detach"])?;
    Ok(())
  }

  /// Create (or reset) a local branch at HEAD
  pub fn create_local_branch_from_head(&self, branch: &str) -> RailResult<()> {
    self.ctx.git.run(&["checkout", "-q", "-B", branch])?;
    Ok(())
  }

  /// Push HEAD to a branch of the upstream repository
  pub fn push_head_to_remote_branch(&self, branch: &str) -> RailResult<()> {
    let url = self.upstream_url()?;
    self.push_head(&url, branch, "upstream")
  }

  fn push_head(&self, url: &str, branch: &str, remote_label: &str) -> RailResult<()> {
    let refspec = format!("HEAD:refs/heads/{}", branch);
    let output = self.ctx.git.run_graceful(&["push", "-q", url, &refspec])?;
    if !output.success() {
      return Err(RailError::Git(GitError::PushFailed {
        remote: remote_label.to_string(),
        branch: branch.to_string(),
        reason: output.stderr.trim().to_string(),
      }));
    }
    Ok(())
  }

  /// Force-fetch a version tag so release notes can be computed against it
  pub fn fetch_compare_tag(&self, version: &Version) -> RailResult<String> {
    let url = self.upstream_url()?;
    let tag = version.to_string();
    let refspec = format!("refs/tags/{tag}:refs/tags/{tag}");
    self
      .ctx
      .git
      .run(&["fetch", "-q", "--force", &url, &refspec])
      .with_context(|| format!("Unable to fetch the compare tag {}", tag))?;
    Ok(tag)
  }

  /// Set the project version (plus any variant-specific edit) in the root package.json
  pub fn update_project_version(&self, version: &Version, update_pkg_json: Option<PackageJsonMutator>) -> RailResult<()> {
    let path = self.ctx.package_json_path();
    let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut pkg: Map<String, Value> = serde_json::from_str(&content)
      .with_context(|| format!("Unable to parse {}", path.display()))?;

    pkg.insert("version".to_string(), Value::String(version.to_string()));
    if let Some(update) = update_pkg_json {
      update(&mut pkg);
    }

    let mut out = serde_json::to_string_pretty(&pkg)?;
    out.push('\n');
    fs::write(&path, out).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("   ✓ Updated project version to {}", version);
    Ok(())
  }

  /// Stage `files` and commit them without running hooks
  pub fn create_commit(&self, message: &str, files: &[PathBuf]) -> RailResult<()> {
    let paths: Vec<String> = files
      .iter()
      .map(|f| self.ctx.relative(f).to_string_lossy().to_string())
      .collect();

    let mut add = vec!["add", "--"];
    add.extend(paths.iter().map(|p| p.as_str()));
    self.ctx.git.run(&add)?;

    let mut commit = vec!["commit", "-q", "--no-verify", "-m", message, "--"];
    commit.extend(paths.iter().map(|p| p.as_str()));
    self.ctx.git.run(&commit)?;
    Ok(())
  }

  /// Let the caretaker review the changelog, then create the release commit
  pub fn wait_for_edits_and_create_release_commit(&self, version: &Version) -> RailResult<()> {
    println!(
      "⚠️  Review the changelog at {} and make edits if needed.",
      self.ctx.config.release.changelog_path.display()
    );
    self
      .ctx
      .confirm_or_abort("Do you want to proceed and commit the changes?")?;

    let files = vec![self.ctx.package_json_path(), self.ctx.changelog_path()];
    self.create_commit(&release_commit_message(version), &files)?;
    println!("   ✓ Created release commit for v{}", version);
    Ok(())
  }

  /// Install, build and hash the release output of the checked-out revision
  pub fn build_release_for_current_branch(&self) -> RailResult<Vec<BuiltPackageWithInfo>> {
    println!("📦 Installing dependencies...");
    self.ctx.npm.install()?;
    println!("🏗️  Building release output...");
    let built = self.ctx.npm.build()?;
    let info = self.ctx.npm.info()?;
    let packages = analyze_and_extend_built_packages(built, &info)?;
    println!("   ✓ Built {} release package(s)", packages.len());
    Ok(packages)
  }

  /// Run the project's precheck over the build output
  pub fn precheck(&self, version: &Version, packages: &[BuiltPackageWithInfo]) -> RailResult<()> {
    let payload = PrecheckPayload {
      new_version: version.to_string(),
      built_packages_with_info: packages,
    };
    self
      .ctx
      .npm
      .precheck(&payload)
      .map_err(|e| RailError::fatal(format!("Release pre-checks failed: {}", e)))?;
    println!("   ✓ Release pre-checks passed");
    Ok(())
  }

  /// The authenticated user's fork of the upstream repository
  pub fn get_fork_of_authenticated_user(&self) -> RailResult<RepoRef> {
    self
      .ctx
      .github
      .get_fork_of_authenticated_user()
      .map_err(check_unauthorized)?
      .ok_or_else(|| {
        RailError::fatal_with_help(
          format!(
            "Unable to find a fork of {} for the authenticated user.",
            self.ctx.config.github.slug()
          ),
          "Create a fork of the upstream repository with the same name and retry.",
        )
      })
  }

  /// `<proposed>`, or `<proposed>_<n>` with the first free `n`
  pub fn find_available_fork_branch(&self, fork: &RepoRef, proposed: &str) -> RailResult<String> {
    let mut candidate = proposed.to_string();
    let mut suffix = 0;
    while self
      .ctx
      .github
      .branch_exists(fork, &candidate)
      .map_err(check_unauthorized)?
    {
      suffix += 1;
      candidate = format!("{}_{}", proposed, suffix);
    }
    Ok(candidate)
  }

  /// Push HEAD to the fork and open a pull request against `target_branch`
  pub fn push_changes_to_fork_and_create_pull_request(
    &self,
    target_branch: &str,
    proposed_fork_branch: &str,
    title: &str,
    body: &str,
  ) -> RailResult<PullRequest> {
    let fork = self.get_fork_of_authenticated_user()?;
    let fork_branch = self.find_available_fork_branch(&fork, proposed_fork_branch)?;
    let fork_url = fork.git_url(self.ctx.config.github.use_ssh);

    self.push_head(&fork_url, &fork_branch, &format!("{}/{}", fork.owner, fork.name))?;

    let created = self
      .ctx
      .github
      .create_pull_request(&NewPullRequest {
        head: format!("{}:{}", fork.owner, fork_branch),
        base: target_branch.to_string(),
        title: title.to_string(),
        body: body.to_string(),
      })
      .map_err(check_unauthorized)?;

    let labels = &self.ctx.config.release.release_pr_labels;
    if !labels.is_empty() {
      self
        .ctx
        .github
        .add_labels(created.number, labels)
        .map_err(check_unauthorized)?;
    }

    println!("   ✓ Created pull request #{}: {}", created.number, created.html_url);
    Ok(PullRequest {
      id: created.number,
      url: created.html_url,
      fork,
      fork_branch,
    })
  }

  /// Human merge gate followed by the merge-wait loop
  pub fn wait_for_pull_request_to_be_merged(&self, pr: &PullRequest) -> RailResult<()> {
    println!("🔎 Pull request #{} needs review: {}", pr.id, pr.url);
    self
      .ctx
      .confirm_or_abort("Once the pull request is approved, proceed with merging it?")?;

    wait_for_pull_request_merged(
      self.ctx.github,
      pr,
      &self.ctx.config.release.merge_method,
      Duration::from_secs(self.ctx.config.release.merge_poll_interval_secs),
    )
  }

  /// Stage `new_version` on `branch` and open the release pull request.
  ///
  /// Release notes cover `<compare_version>..HEAD`.
  pub fn checkout_branch_and_stage_version(
    &self,
    new_version: &Version,
    compare_version: &Version,
    branch: &str,
    options: StagingOptions,
  ) -> RailResult<StagingResult> {
    println!("🚀 Staging v{} on \"{}\"", new_version, branch);

    let before_staging_sha = self.get_latest_commit_of_branch(branch)?;
    self.assert_passing_github_status(&before_staging_sha, branch)?;
    self.checkout_upstream_branch(branch)?;

    let compare_tag = self.fetch_compare_tag(compare_version)?;
    let release_notes = ReleaseNotes::for_range(
      self.ctx.git,
      self.ctx.upstream(),
      new_version.clone(),
      &compare_tag,
      Utc::now().date_naive(),
    )?;

    self.update_project_version(new_version, options.update_pkg_json)?;
    release_notes.prepend_to_changelog(&self.ctx.changelog_path())?;
    println!("   ✓ Updated the changelog");
    self.wait_for_edits_and_create_release_commit(new_version)?;

    let built_packages = self.build_release_for_current_branch()?;
    self.precheck(new_version, &built_packages)?;
    assert_matching_versions(&built_packages, new_version)?;

    let pull_request = self.push_changes_to_fork_and_create_pull_request(
      branch,
      &format!("release-stage-{}", new_version),
      &format!("Bump version to \"v{}\" with changelog.", new_version),
      &format!(
        "Release of v{} staged by release-train. Merge without changes.",
        new_version
      ),
    )?;

    Ok(StagingResult {
      release_notes,
      pull_request,
      built_packages,
      before_staging_sha,
    })
  }

  /// Head of `branch` after the merge, verified to be exactly the release commit on top of `before_staging_sha`
  pub fn verify_release_commit(&self, branch: &str, version: &Version, before_staging_sha: &str) -> RailResult<String> {
    let expected = release_commit_message(version);

    let mut head = self.ctx.github.get_branch(branch).map_err(check_unauthorized)?.commit;
    if !head.message.starts_with(&expected) {
      tracing::debug!(branch, sha = %head.sha, "release commit not visible yet, re-checking once");
      head = self.ctx.github.get_branch(branch).map_err(check_unauthorized)?.commit;
    }

    if !head.message.starts_with(&expected) {
      return Err(RailError::fatal(format!(
        "Latest commit ({}) in \"{}\" branch is not the release commit \"{}\".",
        head.sha, branch, expected
      )));
    }

    if head.parents.first().map(String::as_str) != Some(before_staging_sha) {
      return Err(RailError::fatal_with_help(
        format!(
          "Unexpected parent of the release commit {} in \"{}\": expected {}.",
          head.sha, branch, before_staging_sha
        ),
        "Another commit landed while the release was staged. Restart the release.",
      ));
    }

    Ok(head.sha)
  }

  /// Verify, publish and create the GitHub release of a merged staging result
  pub fn publish(&self, staging: &StagingResult, branch: &str, options: PublishOptions<'_>) -> RailResult<()> {
    let version = &staging.release_notes.version;
    let release_sha = self.verify_release_commit(branch, version, &staging.before_staging_sha)?;

    self.checkout_upstream_branch(branch)?;
    self.ctx.git.run(&["checkout", "-q", "--detach", &release_sha])?;

    assert_integrity(&staging.built_packages)?;
    assert_matching_versions(&staging.built_packages, version)?;

    self.publish_built_packages(&staging.built_packages, options.npm_dist_tag)?;
    self.create_github_release_for_version(
      &staging.release_notes,
      &release_sha,
      options.npm_dist_tag,
      options.make_latest,
    )?;

    println!("✅ Published v{} under the \"{}\" tag", version, options.npm_dist_tag);
    Ok(())
  }

  /// Publish packages in list order; the first failure ends the run
  pub fn publish_built_packages(&self, packages: &[BuiltPackageWithInfo], npm_dist_tag: &str) -> RailResult<()> {
    let mut progress = PackageProgress::new(packages.len(), format!("Publishing ({})", npm_dist_tag));
    let mut published = Vec::new();

    for pkg in packages {
      self
        .ctx
        .npm
        .publish(&pkg.output_path, npm_dist_tag, self.ctx.registry())
        .map_err(|e| {
          RailError::fatal(format!(
            "Unable to publish \"{}\": {}\nAlready published: [{}]",
            pkg.name,
            e,
            published.join(", ")
          ))
        })?;
      tracing::info!(package = %pkg.name, tag = npm_dist_tag, "published");
      published.push(pkg.name.clone());
      progress.inc();
    }
    Ok(())
  }

  /// Tag the release commit and create the GitHub release.
  ///
  /// Releases published under `next` are marked as GitHub prereleases, stable
  /// majors included, until they are tagged as `latest`.
  pub fn create_github_release_for_version(
    &self,
    notes: &ReleaseNotes,
    sha: &str,
    npm_dist_tag: &str,
    make_latest: bool,
  ) -> RailResult<()> {
    let tag = notes.version.to_string();
    self
      .ctx
      .github
      .create_tag_ref(&tag, sha)
      .map_err(check_unauthorized)?;

    let mut body = notes.github_release_body();
    if body.len() > MAX_GITHUB_RELEASE_BODY_LENGTH {
      let url = notes.changelog_url(&self.ctx.config.github.main_branch, &self.ctx.config.release.changelog_path);
      body = format!(
        "Release notes are too large to be captured here. [View all changes here]({}).",
        url
      );
    }

    self
      .ctx
      .github
      .create_release(&NewRelease {
        tag_name: tag.clone(),
        name: tag.clone(),
        body,
        prerelease: !notes.version.pre.is_empty() || npm_dist_tag == "next",
        make_latest,
      })
      .map_err(check_unauthorized)?;
    println!("   ✓ Created GitHub release for v{}", tag);
    Ok(())
  }

  /// Copy a release's changelog entry into the `next` branch through a pull request.
  ///
  /// A failure here is reported but does not undo the published release.
  pub fn cherry_pick_changelog_into_next_branch(&self, notes: &ReleaseNotes, staging_branch: &str) -> RailResult<bool> {
    let next_branch = &self.ctx.config.github.main_branch;
    let commit_message = changelog_cherry_pick_commit_message(&notes.version);

    self.checkout_upstream_branch(next_branch)?;
    notes.prepend_to_changelog(&self.ctx.changelog_path())?;
    self.create_commit(&commit_message, &[self.ctx.changelog_path()])?;

    let pr = self.push_changes_to_fork_and_create_pull_request(
      next_branch,
      &format!("changelog-cherry-pick-{}", notes.version),
      &commit_message,
      &format!(
        "Cherry-picks the changelog from the \"{}\" branch to the next branch ({}).",
        staging_branch, next_branch
      ),
    )?;

    match self.wait_for_pull_request_to_be_merged(&pr) {
      Ok(()) => Ok(true),
      Err(e) if e.is_user_aborted() => Err(e),
      Err(e) => {
        println!("⚠️  Could not merge the changelog cherry-pick: {}", e);
        println!("   Merge {} manually.", pr.url);
        Ok(false)
      }
    }
  }

  /// Update the version of the `next` branch through a pull request.
  ///
  /// With release notes, the changelog entry is included in the same commit.
  pub fn create_next_branch_update_pull_request(
    &self,
    notes: Option<&ReleaseNotes>,
    new_version: &Version,
    commit_message: &str,
    title: &str,
  ) -> RailResult<PullRequest> {
    let next_branch = &self.ctx.config.github.main_branch;
    let before = self.get_latest_commit_of_branch(next_branch)?;
    self.assert_passing_github_status(&before, next_branch)?;
    self.checkout_upstream_branch(next_branch)?;

    self.update_project_version(new_version, None)?;
    let mut files = vec![self.ctx.package_json_path()];
    if let Some(notes) = notes {
      notes.prepend_to_changelog(&self.ctx.changelog_path())?;
      files.push(self.ctx.changelog_path());
    }
    self.create_commit(commit_message, &files)?;

    let body = match notes {
      Some(notes) => format!(
        "Updates the next branch to v{} and includes the release notes of v{}.",
        new_version, notes.version
      ),
      None => format!("Updates the next branch to v{}.", new_version),
    };
    self.push_changes_to_fork_and_create_pull_request(
      next_branch,
      &format!("next-release-train-{}", new_version),
      title,
      &body,
    )
  }
}

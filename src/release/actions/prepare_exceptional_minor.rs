use super::set_exceptional_minor_marker;
use crate::core::context::ReleaseContext;
use crate::core::error::RailResult;
use crate::release::commit_message::exceptional_minor_prepare_commit_message;
use crate::release::pipeline::ReleasePipeline;
use crate::versioning::prerelease::next_prerelease_of;
use crate::versioning::{ActiveReleaseTrains, ReleaseTrain};
use semver::Version;

/// Open an exceptional minor branch off the latest line while `next` (or the
/// release-candidate train) is occupied by a major
pub struct PrepareExceptionalMinor {
  latest: ReleaseTrain,
  new_branch: String,
  new_version: Version,
}

impl PrepareExceptionalMinor {
  pub fn is_active(trains: &ActiveReleaseTrains, _ctx: &ReleaseContext<'_>) -> RailResult<bool> {
    if trains.exceptional_minor.is_some() {
      return Ok(false);
    }
    let active = match &trains.release_candidate {
      Some(rc) => rc.is_major,
      None => trains.next.is_major,
    };
    Ok(active)
  }

  pub fn new(trains: &ActiveReleaseTrains) -> RailResult<Self> {
    let latest = trains.latest.clone();
    let minor = latest.version.minor + 1;
    Ok(Self {
      new_branch: format!("{}.{}.x", latest.version.major, minor),
      new_version: next_prerelease_of(latest.version.major, minor)?,
      latest,
    })
  }

  pub fn description(&self) -> String {
    format!(
      "Prepare an exceptional minor branch \"{}\" (v{}).",
      self.new_branch, self.new_version
    )
  }

  pub fn perform(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    let pipeline = ReleasePipeline::new(ctx);
    let base = &self.latest.branch_name;

    let head = pipeline.get_latest_commit_of_branch(base)?;
    pipeline.assert_passing_github_status(&head, base)?;
    pipeline.checkout_upstream_branch(base)?;
    pipeline.create_local_branch_from_head(&self.new_branch)?;

    pipeline.update_project_version(&self.new_version, Some(set_exceptional_minor_marker))?;
    pipeline.create_commit(
      &exceptional_minor_prepare_commit_message(&self.new_branch),
      &[ctx.package_json_path()],
    )?;

    ctx.confirm_or_abort(&format!(
      "Push the exceptional minor branch \"{}\" upstream?",
      self.new_branch
    ))?;
    pipeline.push_head_to_remote_branch(&self.new_branch)?;

    println!("✅ Created exceptional minor branch \"{}\" (v{})", self.new_branch, self.new_version);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestHarness;
  use serde_json::Value;
  use std::fs;

  fn trains() -> ActiveReleaseTrains {
    ActiveReleaseTrains {
      latest: ReleaseTrain::new("12.2.x", Version::parse("12.2.9").unwrap()),
      release_candidate: Some(ReleaseTrain::new("13.0.x", Version::parse("13.0.0-next.3").unwrap())),
      exceptional_minor: None,
      next: ReleaseTrain::new("main", Version::parse("13.1.0-next.0").unwrap()),
    }
  }

  #[test]
  fn test_branch_created_with_marker() {
    let h = TestHarness::new();
    let ctx = h.context();
    let action = PrepareExceptionalMinor::new(&trains()).unwrap();
    assert_eq!(action.description(), "Prepare an exceptional minor branch \"12.3.x\" (v12.3.0-next.0).");
    action.perform(&ctx).unwrap();

    let pkg: Value = serde_json::from_str(&fs::read_to_string(h.root().join("package.json")).unwrap()).unwrap();
    assert_eq!(pkg["version"], "12.3.0-next.0");
    assert_eq!(pkg["__exceptionalMinor__"], true);

    let calls = h.git.calls();
    assert!(calls.iter().any(|c| c == "checkout -q -B 12.3.x"));
    assert!(calls.iter().any(|c| c.contains("build: prepare exceptional minor branch: 12.3.x")));
    assert!(calls.last().unwrap().ends_with("HEAD:refs/heads/12.3.x"));
  }

  #[test]
  fn test_declined_push_leaves_upstream_untouched() {
    let h = TestHarness::new();
    h.prompt.answer_confirm(false);
    let ctx = h.context();
    let err = PrepareExceptionalMinor::new(&trains()).unwrap().perform(&ctx).unwrap_err();
    assert!(err.is_user_aborted());
    assert!(!h.git.calls().iter().any(|c| c.starts_with("push")));
  }
}

use super::stage_and_publish;
use crate::core::context::ReleaseContext;
use crate::core::error::RailResult;
use crate::release::pipeline::{PublishOptions, ReleasePipeline, StagingOptions};
use crate::versioning::fetch_project_registry_info;
use crate::versioning::prerelease::{compute_new_prerelease_version, release_notes_compare_version};
use crate::versioning::{ActiveReleaseTrains, ReleaseTrain};
use semver::Version;

/// Next prerelease of the release-candidate train, or of `next` when there is none
pub struct CutNextPrerelease {
  train: ReleaseTrain,
  new_version: Version,
  compare_version: Version,
  is_next_train: bool,
}

impl CutNextPrerelease {
  pub fn is_active(_trains: &ActiveReleaseTrains, _ctx: &ReleaseContext<'_>) -> RailResult<bool> {
    Ok(true)
  }

  pub fn new(trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> RailResult<Self> {
    let registry = fetch_project_registry_info(ctx.npm, ctx.config)?;
    let train = trains.release_candidate.clone().unwrap_or_else(|| trains.next.clone());

    Ok(Self {
      new_version: compute_new_prerelease_version(&train, &registry)?,
      compare_version: release_notes_compare_version(&train, &trains.latest, &registry),
      is_next_train: trains.release_candidate.is_none(),
      train,
    })
  }

  pub fn description(&self) -> String {
    let label = if self.is_next_train {
      "next"
    } else {
      "feature-freeze/release-candidate"
    };
    format!("Cut a new {} pre-release (v{}).", label, self.new_version)
  }

  pub fn perform(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    let branch = &self.train.branch_name;
    let staging = stage_and_publish(
      ctx,
      &self.new_version,
      &self.compare_version,
      branch,
      StagingOptions::default(),
      PublishOptions {
        npm_dist_tag: "next",
        make_latest: false,
      },
    )?;

    if !self.is_next_train {
      ReleasePipeline::new(ctx).cherry_pick_changelog_into_next_branch(&staging.release_notes, branch)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::npm::RegistryPackageInfo;
  use crate::testing::TestHarness;

  fn trains(rc: Option<&str>) -> ActiveReleaseTrains {
    ActiveReleaseTrains {
      latest: ReleaseTrain::new("12.2.x", Version::parse("12.2.9").unwrap()),
      release_candidate: rc.map(|v| ReleaseTrain::new("12.3.x", Version::parse(v).unwrap())),
      exceptional_minor: None,
      next: ReleaseTrain::new("main", Version::parse("13.0.0-next.4").unwrap()),
    }
  }

  #[test]
  fn test_unpublished_next_version_is_released_as_is() {
    let h = TestHarness::new();
    let ctx = h.context();
    let action = CutNextPrerelease::new(&trains(None), &ctx).unwrap();
    assert_eq!(action.new_version, Version::parse("13.0.0-next.4").unwrap());
    assert_eq!(action.compare_version, Version::parse("12.2.9").unwrap());
    assert_eq!(action.description(), "Cut a new next pre-release (v13.0.0-next.4).");
  }

  #[test]
  fn test_published_rc_train_is_bumped() {
    let h = TestHarness::new();
    let mut registry = RegistryPackageInfo::default();
    registry.versions.push("12.3.0-rc.1".into());
    h.npm.set_registry(registry);
    let ctx = h.context();

    let action = CutNextPrerelease::new(&trains(Some("12.3.0-rc.1")), &ctx).unwrap();
    assert_eq!(action.train.branch_name, "12.3.x");
    assert_eq!(action.new_version, Version::parse("12.3.0-rc.2").unwrap());
    assert_eq!(action.compare_version, Version::parse("12.3.0-rc.1").unwrap());
    assert!(!action.is_next_train);
  }
}

use super::branch_off_next_and_release;
use crate::core::context::ReleaseContext;
use crate::core::error::RailResult;
use crate::versioning::fetch_project_registry_info;
use crate::versioning::prerelease::{compute_new_prerelease_version, release_notes_compare_version};
use crate::versioning::ActiveReleaseTrains;
use semver::Version;

/// Branch `next` off into a feature-freeze train.
///
/// Only offered for a major `next`; minors move straight into release-candidate.
pub struct MoveNextIntoFeatureFreeze {
  trains: ActiveReleaseTrains,
  new_version: Version,
  compare_version: Version,
}

impl MoveNextIntoFeatureFreeze {
  pub fn is_active(trains: &ActiveReleaseTrains, _ctx: &ReleaseContext<'_>) -> RailResult<bool> {
    Ok(trains.release_candidate.is_none() && trains.next.is_major)
  }

  pub fn new(trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> RailResult<Self> {
    let registry = fetch_project_registry_info(ctx.npm, ctx.config)?;
    Ok(Self {
      new_version: compute_new_prerelease_version(&trains.next, &registry)?,
      compare_version: release_notes_compare_version(&trains.next, &trains.latest, &registry),
      trains: trains.clone(),
    })
  }

  pub fn description(&self) -> String {
    format!(
      "Move the \"{}\" branch into feature-freeze phase (v{}).",
      self.trains.next.branch_name, self.new_version
    )
  }

  pub fn perform(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    branch_off_next_and_release(ctx, &self.trains, &self.new_version, &self.compare_version)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::github::CommitSummary;
  use crate::testing::TestHarness;
  use crate::versioning::ReleaseTrain;
  use std::fs;

  #[test]
  fn test_branches_off_publishes_and_bumps_next() {
    let h = TestHarness::new();
    h.github.queue_branch_heads(
      "13.0.x",
      vec![
        CommitSummary {
          sha: "main-head".into(),
          message: "feat: last feature".into(),
          parents: vec!["p".into()],
        },
        CommitSummary {
          sha: "rel".into(),
          message: "release: cut the v13.0.0-next.2 release".into(),
          parents: vec!["main-head".into()],
        },
      ],
    );
    let trains = ActiveReleaseTrains {
      latest: ReleaseTrain::new("12.2.x", Version::parse("12.2.9").unwrap()),
      release_candidate: None,
      exceptional_minor: None,
      next: ReleaseTrain::new("main", Version::parse("13.0.0-next.2").unwrap()),
    };
    let ctx = h.context();

    let action = MoveNextIntoFeatureFreeze::new(&trains, &ctx).unwrap();
    assert_eq!(action.new_version, Version::parse("13.0.0-next.2").unwrap());
    action.perform(&ctx).unwrap();

    let calls = h.git.calls();
    assert!(calls.iter().any(|c| c == "checkout -q -B 13.0.x"));
    assert!(calls.iter().any(|c| c.ends_with("HEAD:refs/heads/13.0.x")));

    let prs = h.github.pull_requests();
    assert_eq!(prs[0].base, "13.0.x");
    assert_eq!(prs[1].base, "main");
    assert!(prs[1].title.contains("13.1.0-next.0"));
    assert_eq!(h.npm.published(), vec![("core".to_string(), "next".to_string())]);

    let pkg = fs::read_to_string(h.root().join("package.json")).unwrap();
    assert!(pkg.contains("13.1.0-next.0"));
  }

  #[test]
  fn test_only_offered_for_major_next() {
    let h = TestHarness::new();
    let ctx = h.context();
    let mut trains = ActiveReleaseTrains {
      latest: ReleaseTrain::new("12.2.x", Version::parse("12.2.9").unwrap()),
      release_candidate: None,
      exceptional_minor: None,
      next: ReleaseTrain::new("main", Version::parse("13.0.0-next.2").unwrap()),
    };
    assert!(MoveNextIntoFeatureFreeze::is_active(&trains, &ctx).unwrap());

    trains.next = ReleaseTrain::new("main", Version::parse("12.3.0-next.2").unwrap());
    assert!(!MoveNextIntoFeatureFreeze::is_active(&trains, &ctx).unwrap());
  }
}

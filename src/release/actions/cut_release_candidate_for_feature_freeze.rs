use super::stage_and_publish;
use crate::core::context::ReleaseContext;
use crate::core::error::{RailError, RailResult};
use crate::release::pipeline::{PublishOptions, ReleasePipeline, StagingOptions};
use crate::versioning::prerelease::release_candidate_of;
use crate::versioning::{ActiveReleaseTrains, ReleaseTrain};
use semver::Version;

/// First release candidate of a train in feature freeze
pub struct CutReleaseCandidateForFeatureFreeze {
  train: ReleaseTrain,
  new_version: Version,
}

impl CutReleaseCandidateForFeatureFreeze {
  pub fn is_active(trains: &ActiveReleaseTrains, _ctx: &ReleaseContext<'_>) -> RailResult<bool> {
    Ok(
      trains
        .release_candidate
        .as_ref()
        .is_some_and(|t| t.is_in_phase("next")),
    )
  }

  pub fn new(trains: &ActiveReleaseTrains) -> RailResult<Self> {
    let train = trains
      .release_candidate
      .clone()
      .ok_or_else(|| RailError::fatal("No release-candidate train to cut a release candidate for."))?;
    Ok(Self {
      new_version: release_candidate_of(&train.version)?,
      train,
    })
  }

  pub fn description(&self) -> String {
    format!("Cut a first release-candidate for the feature-freeze branch (v{}).", self.new_version)
  }

  pub fn perform(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    let branch = &self.train.branch_name;
    let staging = stage_and_publish(
      ctx,
      &self.new_version,
      &self.train.version,
      branch,
      StagingOptions::default(),
      PublishOptions {
        npm_dist_tag: "next",
        make_latest: false,
      },
    )?;
    ReleasePipeline::new(ctx).cherry_pick_changelog_into_next_branch(&staging.release_notes, branch)?;
    Ok(())
  }
}

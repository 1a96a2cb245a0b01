use super::{EXCEPTIONAL_MINOR_NPM_DIST_TAG, stage_and_publish};
use crate::core::context::ReleaseContext;
use crate::core::error::{RailError, RailResult};
use crate::release::pipeline::{PublishOptions, StagingOptions};
use crate::versioning::prerelease::release_candidate_of;
use crate::versioning::{ActiveReleaseTrains, ReleaseTrain};
use semver::Version;

/// First release candidate of the exceptional minor
pub struct CutExceptionalMinorReleaseCandidate {
  train: ReleaseTrain,
  new_version: Version,
}

impl CutExceptionalMinorReleaseCandidate {
  pub fn is_active(trains: &ActiveReleaseTrains, _ctx: &ReleaseContext<'_>) -> RailResult<bool> {
    Ok(
      trains
        .exceptional_minor
        .as_ref()
        .is_some_and(|t| t.is_in_phase("next")),
    )
  }

  pub fn new(trains: &ActiveReleaseTrains) -> RailResult<Self> {
    let train = trains
      .exceptional_minor
      .clone()
      .ok_or_else(|| RailError::fatal("No exceptional minor train is active."))?;
    Ok(Self {
      new_version: release_candidate_of(&train.version)?,
      train,
    })
  }

  pub fn description(&self) -> String {
    format!("Exceptional Minor: Cut the first release-candidate (v{}).", self.new_version)
  }

  pub fn perform(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    stage_and_publish(
      ctx,
      &self.new_version,
      &self.train.version,
      &self.train.branch_name,
      StagingOptions::default(),
      PublishOptions {
        npm_dist_tag: EXCEPTIONAL_MINOR_NPM_DIST_TAG,
        make_latest: false,
      },
    )?;
    Ok(())
  }
}

use super::{EXCEPTIONAL_MINOR_NPM_DIST_TAG, stage_and_publish};
use crate::core::context::ReleaseContext;
use crate::core::error::{RailError, RailResult};
use crate::release::pipeline::{PublishOptions, StagingOptions};
use crate::versioning::fetch_project_registry_info;
use crate::versioning::prerelease::{compute_new_prerelease_version, release_notes_compare_version};
use crate::versioning::{ActiveReleaseTrains, ReleaseTrain};
use semver::Version;

/// Prerelease of the exceptional minor, kept off the `next` tag.
///
/// No changelog cherry-pick: `next` only learns about the exceptional minor
/// once it is stabilized.
pub struct CutExceptionalMinorPrerelease {
  train: ReleaseTrain,
  new_version: Version,
  compare_version: Version,
}

impl CutExceptionalMinorPrerelease {
  pub fn is_active(trains: &ActiveReleaseTrains, _ctx: &ReleaseContext<'_>) -> RailResult<bool> {
    Ok(trains.exceptional_minor.is_some())
  }

  pub fn new(trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> RailResult<Self> {
    let train = trains
      .exceptional_minor
      .clone()
      .ok_or_else(|| RailError::fatal("No exceptional minor train is active."))?;
    let registry = fetch_project_registry_info(ctx.npm, ctx.config)?;

    Ok(Self {
      new_version: compute_new_prerelease_version(&train, &registry)?,
      compare_version: release_notes_compare_version(&train, &trains.latest, &registry),
      train,
    })
  }

  pub fn description(&self) -> String {
    format!("Exceptional Minor: Cut a new pre-release (v{}).", self.new_version)
  }

  pub fn perform(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    stage_and_publish(
      ctx,
      &self.new_version,
      &self.compare_version,
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

use super::stage_and_publish;
use crate::core::context::ReleaseContext;
use crate::core::error::RailResult;
use crate::release::pipeline::{PublishOptions, ReleasePipeline, StagingOptions};
use crate::versioning::{ActiveReleaseTrains, ReleaseTrain};
use semver::Version;

/// Patch release of the latest line, published as `latest`
pub struct CutNewPatch {
  latest: ReleaseTrain,
  new_version: Version,
}

impl CutNewPatch {
  pub fn is_active(_trains: &ActiveReleaseTrains, _ctx: &ReleaseContext<'_>) -> RailResult<bool> {
    Ok(true)
  }

  pub fn new(trains: &ActiveReleaseTrains) -> Self {
    let latest = trains.latest.clone();
    let new_version = Version::new(latest.version.major, latest.version.minor, latest.version.patch + 1);
    Self { latest, new_version }
  }

  pub fn description(&self) -> String {
    format!(
      "Cut a new patch release for the \"{}\" branch (v{}).",
      self.latest.branch_name, self.new_version
    )
  }

  pub fn perform(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    let branch = &self.latest.branch_name;
    let staging = stage_and_publish(
      ctx,
      &self.new_version,
      &self.latest.version,
      branch,
      StagingOptions::default(),
      PublishOptions {
        npm_dist_tag: "latest",
        make_latest: true,
      },
    )?;
    ReleasePipeline::new(ctx).cherry_pick_changelog_into_next_branch(&staging.release_notes, branch)?;
    Ok(())
  }
}

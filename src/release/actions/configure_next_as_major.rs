use crate::core::context::ReleaseContext;
use crate::core::error::RailResult;
use crate::release::commit_message::next_branch_switch_commit_message;
use crate::release::pipeline::ReleasePipeline;
use crate::versioning::ActiveReleaseTrains;
use crate::versioning::prerelease::next_prerelease_of;
use semver::Version;

/// Switch `next` to the following major
pub struct ConfigureNextAsMajor {
  next_branch: String,
  new_version: Version,
}

impl ConfigureNextAsMajor {
  pub fn is_active(trains: &ActiveReleaseTrains, _ctx: &ReleaseContext<'_>) -> RailResult<bool> {
    Ok(!trains.next.is_major)
  }

  pub fn new(trains: &ActiveReleaseTrains) -> RailResult<Self> {
    Ok(Self {
      next_branch: trains.next.branch_name.clone(),
      new_version: next_prerelease_of(trains.next.version.major + 1, 0)?,
    })
  }

  pub fn description(&self) -> String {
    format!(
      "Configure the \"{}\" branch to be released as major (v{}).",
      self.next_branch, self.new_version
    )
  }

  pub fn perform(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    let pipeline = ReleasePipeline::new(ctx);
    let pr = pipeline.create_next_branch_update_pull_request(
      None,
      &self.new_version,
      &next_branch_switch_commit_message(&self.new_version),
      &format!(
        "Configure next branch to receive major changes for v{}",
        self.new_version.major
      ),
    )?;
    pipeline.wait_for_pull_request_to_be_merged(&pr)?;
    println!("✅ The \"{}\" branch now targets v{}", self.next_branch, self.new_version);
    Ok(())
  }
}

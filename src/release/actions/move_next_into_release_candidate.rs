use super::branch_off_next_and_release;
use crate::core::context::ReleaseContext;
use crate::core::error::RailResult;
use crate::versioning::ActiveReleaseTrains;
use crate::versioning::fetch_project_registry_info;
use crate::versioning::prerelease::{release_candidate_of, release_notes_compare_version};
use semver::Version;

/// Branch `next` off directly into a release candidate, skipping feature freeze.
///
/// Not offered for majors, which always go through feature freeze.
pub struct MoveNextIntoReleaseCandidate {
  trains: ActiveReleaseTrains,
  new_version: Version,
  compare_version: Version,
}

impl MoveNextIntoReleaseCandidate {
  pub fn is_active(trains: &ActiveReleaseTrains, _ctx: &ReleaseContext<'_>) -> RailResult<bool> {
    Ok(trains.release_candidate.is_none() && !trains.next.is_major)
  }

  pub fn new(trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> RailResult<Self> {
    let registry = fetch_project_registry_info(ctx.npm, ctx.config)?;
    Ok(Self {
      new_version: release_candidate_of(&trains.next.version)?,
      compare_version: release_notes_compare_version(&trains.next, &trains.latest, &registry),
      trains: trains.clone(),
    })
  }

  pub fn description(&self) -> String {
    format!(
      "Move the \"{}\" branch into release-candidate phase (v{}).",
      self.trains.next.branch_name, self.new_version
    )
  }

  pub fn perform(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    branch_off_next_and_release(ctx, &self.trains, &self.new_version, &self.compare_version)
  }
}

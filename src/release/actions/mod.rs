//! Release actions
//!
//! Every action is a variant of [`ReleaseAction`]. Each variant struct offers
//! `is_active(trains, ctx)`, a read-only check of whether the action applies
//! to the current release trains, and `perform(ctx)`, the only place side
//! effects happen. [`available_actions`] builds the menu shown to the caretaker.

mod configure_next_as_major;
mod cut_exceptional_minor_prerelease;
mod cut_exceptional_minor_release_candidate;
mod cut_lts_patch;
mod cut_new_patch;
mod cut_next_prerelease;
mod cut_release_candidate_for_feature_freeze;
mod cut_stable;
mod move_next_into_feature_freeze;
mod move_next_into_release_candidate;
mod prepare_exceptional_minor;
mod tag_recent_major_as_latest;

pub use configure_next_as_major::ConfigureNextAsMajor;
pub use cut_exceptional_minor_prerelease::CutExceptionalMinorPrerelease;
pub use cut_exceptional_minor_release_candidate::CutExceptionalMinorReleaseCandidate;
pub use cut_lts_patch::CutLongTermSupportPatch;
pub use cut_new_patch::CutNewPatch;
pub use cut_next_prerelease::CutNextPrerelease;
pub use cut_release_candidate_for_feature_freeze::CutReleaseCandidateForFeatureFreeze;
pub use cut_stable::CutStable;
pub use move_next_into_feature_freeze::MoveNextIntoFeatureFreeze;
pub use move_next_into_release_candidate::MoveNextIntoReleaseCandidate;
pub use prepare_exceptional_minor::PrepareExceptionalMinor;
pub use tag_recent_major_as_latest::TagRecentMajorAsLatest;

use super::commit_message::next_branch_bump_commit_message;
use super::pipeline::{PublishOptions, ReleasePipeline, StagingOptions, StagingResult};
use crate::core::context::ReleaseContext;
use crate::core::error::RailResult;
use crate::versioning::ActiveReleaseTrains;
use crate::versioning::prerelease::next_prerelease_of;
use crate::versioning::version_branches::{EXCEPTIONAL_MINOR_MARKER, version_branch_name};
use semver::Version;
use serde_json::{Map, Value};

/// Dist tag for exceptional-minor prereleases
pub const EXCEPTIONAL_MINOR_NPM_DIST_TAG: &str = "do-not-use-exceptional-minor";

/// A release action selected by the caretaker
pub enum ReleaseAction {
  CutLongTermSupportPatch(CutLongTermSupportPatch),
  CutNewPatch(CutNewPatch),
  CutNextPrerelease(CutNextPrerelease),
  CutReleaseCandidateForFeatureFreeze(CutReleaseCandidateForFeatureFreeze),
  CutStable(CutStable),
  MoveNextIntoFeatureFreeze(MoveNextIntoFeatureFreeze),
  MoveNextIntoReleaseCandidate(MoveNextIntoReleaseCandidate),
  ConfigureNextAsMajor(ConfigureNextAsMajor),
  TagRecentMajorAsLatest(TagRecentMajorAsLatest),
  PrepareExceptionalMinor(PrepareExceptionalMinor),
  CutExceptionalMinorPrerelease(CutExceptionalMinorPrerelease),
  CutExceptionalMinorReleaseCandidate(CutExceptionalMinorReleaseCandidate),
}

impl ReleaseAction {
  /// Menu entry
  pub fn description(&self) -> String {
    match self {
      ReleaseAction::CutLongTermSupportPatch(a) => a.description(),
      ReleaseAction::CutNewPatch(a) => a.description(),
      ReleaseAction::CutNextPrerelease(a) => a.description(),
      ReleaseAction::CutReleaseCandidateForFeatureFreeze(a) => a.description(),
      ReleaseAction::CutStable(a) => a.description(),
      ReleaseAction::MoveNextIntoFeatureFreeze(a) => a.description(),
      ReleaseAction::MoveNextIntoReleaseCandidate(a) => a.description(),
      ReleaseAction::ConfigureNextAsMajor(a) => a.description(),
      ReleaseAction::TagRecentMajorAsLatest(a) => a.description(),
      ReleaseAction::PrepareExceptionalMinor(a) => a.description(),
      ReleaseAction::CutExceptionalMinorPrerelease(a) => a.description(),
      ReleaseAction::CutExceptionalMinorReleaseCandidate(a) => a.description(),
    }
  }

  pub fn perform(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    match self {
      ReleaseAction::CutLongTermSupportPatch(a) => a.perform(ctx),
      ReleaseAction::CutNewPatch(a) => a.perform(ctx),
      ReleaseAction::CutNextPrerelease(a) => a.perform(ctx),
      ReleaseAction::CutReleaseCandidateForFeatureFreeze(a) => a.perform(ctx),
      ReleaseAction::CutStable(a) => a.perform(ctx),
      ReleaseAction::MoveNextIntoFeatureFreeze(a) => a.perform(ctx),
      ReleaseAction::MoveNextIntoReleaseCandidate(a) => a.perform(ctx),
      ReleaseAction::ConfigureNextAsMajor(a) => a.perform(ctx),
      ReleaseAction::TagRecentMajorAsLatest(a) => a.perform(ctx),
      ReleaseAction::PrepareExceptionalMinor(a) => a.perform(ctx),
      ReleaseAction::CutExceptionalMinorPrerelease(a) => a.perform(ctx),
      ReleaseAction::CutExceptionalMinorReleaseCandidate(a) => a.perform(ctx),
    }
  }
}

/// Every action whose precondition holds for `trains`, in menu order
pub fn available_actions(trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> RailResult<Vec<ReleaseAction>> {
  let mut actions = Vec::new();

  if CutLongTermSupportPatch::is_active(trains, ctx)? {
    actions.push(ReleaseAction::CutLongTermSupportPatch(CutLongTermSupportPatch::new(trains, ctx)?));
  }
  if CutNewPatch::is_active(trains, ctx)? {
    actions.push(ReleaseAction::CutNewPatch(CutNewPatch::new(trains)));
  }
  if CutNextPrerelease::is_active(trains, ctx)? {
    actions.push(ReleaseAction::CutNextPrerelease(CutNextPrerelease::new(trains, ctx)?));
  }
  if CutReleaseCandidateForFeatureFreeze::is_active(trains, ctx)? {
    actions.push(ReleaseAction::CutReleaseCandidateForFeatureFreeze(
      CutReleaseCandidateForFeatureFreeze::new(trains)?,
    ));
  }
  if CutStable::is_active(trains, ctx)? {
    actions.push(ReleaseAction::CutStable(CutStable::new(trains)?));
  }
  if MoveNextIntoFeatureFreeze::is_active(trains, ctx)? {
    actions.push(ReleaseAction::MoveNextIntoFeatureFreeze(MoveNextIntoFeatureFreeze::new(trains, ctx)?));
  }
  if MoveNextIntoReleaseCandidate::is_active(trains, ctx)? {
    actions.push(ReleaseAction::MoveNextIntoReleaseCandidate(MoveNextIntoReleaseCandidate::new(
      trains, ctx,
    )?));
  }
  if ConfigureNextAsMajor::is_active(trains, ctx)? {
    actions.push(ReleaseAction::ConfigureNextAsMajor(ConfigureNextAsMajor::new(trains)?));
  }
  if TagRecentMajorAsLatest::is_active(trains, ctx)? {
    actions.push(ReleaseAction::TagRecentMajorAsLatest(TagRecentMajorAsLatest::new(trains)));
  }
  if PrepareExceptionalMinor::is_active(trains, ctx)? {
    actions.push(ReleaseAction::PrepareExceptionalMinor(PrepareExceptionalMinor::new(trains)?));
  }
  if CutExceptionalMinorPrerelease::is_active(trains, ctx)? {
    actions.push(ReleaseAction::CutExceptionalMinorPrerelease(CutExceptionalMinorPrerelease::new(
      trains, ctx,
    )?));
  }
  if CutExceptionalMinorReleaseCandidate::is_active(trains, ctx)? {
    actions.push(ReleaseAction::CutExceptionalMinorReleaseCandidate(
      CutExceptionalMinorReleaseCandidate::new(trains)?,
    ));
  }

  Ok(actions)
}

fn clear_exceptional_minor_marker(pkg: &mut Map<String, Value>) {
  pkg.remove(EXCEPTIONAL_MINOR_MARKER);
}

fn set_exceptional_minor_marker(pkg: &mut Map<String, Value>) {
  pkg.insert(EXCEPTIONAL_MINOR_MARKER.to_string(), Value::Bool(true));
}

/// Stage on `branch`, wait for the merge and publish
fn stage_and_publish(
  ctx: &ReleaseContext<'_>,
  new_version: &Version,
  compare_version: &Version,
  branch: &str,
  staging: StagingOptions,
  publish: PublishOptions<'_>,
) -> RailResult<StagingResult> {
  let pipeline = ReleasePipeline::new(ctx);
  let result = pipeline.checkout_branch_and_stage_version(new_version, compare_version, branch, staging)?;
  pipeline.wait_for_pull_request_to_be_merged(&result.pull_request)?;
  pipeline.publish(&result, branch, publish)?;
  Ok(result)
}

/// Branch `next` off into `<major>.<minor>.x`, release `new_version` from there
/// and move `next` on to the following minor
fn branch_off_next_and_release(
  ctx: &ReleaseContext<'_>,
  trains: &ActiveReleaseTrains,
  new_version: &Version,
  compare_version: &Version,
) -> RailResult<()> {
  let pipeline = ReleasePipeline::new(ctx);
  let next = &trains.next;
  let new_branch = version_branch_name(&next.version);

  let before = pipeline.get_latest_commit_of_branch(&next.branch_name)?;
  pipeline.assert_passing_github_status(&before, &next.branch_name)?;
  pipeline.checkout_upstream_branch(&next.branch_name)?;
  pipeline.create_local_branch_from_head(&new_branch)?;
  pipeline.push_head_to_remote_branch(&new_branch)?;
  println!("   ✓ Created version branch \"{}\" from \"{}\"", new_branch, next.branch_name);

  let staging = pipeline.checkout_branch_and_stage_version(
    new_version,
    compare_version,
    &new_branch,
    StagingOptions::default(),
  )?;

  let next_version = next_prerelease_of(next.version.major, next.version.minor + 1)?;
  let next_pr = pipeline.create_next_branch_update_pull_request(
    Some(&staging.release_notes),
    &next_version,
    &next_branch_bump_commit_message(&next_version),
    &format!("Update next branch to reflect new release-train \"v{}\".", next_version),
  )?;

  pipeline.wait_for_pull_request_to_be_merged(&staging.pull_request)?;
  pipeline.publish(
    &staging,
    &new_branch,
    PublishOptions {
      npm_dist_tag: "next",
      make_latest: false,
    },
  )?;
  pipeline.wait_for_pull_request_to_be_merged(&next_pr)?;
  Ok(())
}

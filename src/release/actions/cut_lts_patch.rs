use super::stage_and_publish;
use crate::core::context::ReleaseContext;
use crate::core::error::{RailError, RailResult};
use crate::release::pipeline::{PublishOptions, ReleasePipeline, StagingOptions};
use crate::versioning::ActiveReleaseTrains;
use crate::versioning::fetch_project_registry_info;
use crate::versioning::lts::{LtsBranch, LtsBranches, fetch_long_term_support_branches};
use chrono::Utc;
use semver::Version;

/// Patch release of a long-term support line, published under its `v<major>-lts` tag
pub struct CutLongTermSupportPatch {
  lts: LtsBranches,
}

fn lts_branches(ctx: &ReleaseContext<'_>) -> RailResult<LtsBranches> {
  let info = fetch_project_registry_info(ctx.npm, ctx.config)?;
  fetch_long_term_support_branches(&info, Utc::now())
}

impl CutLongTermSupportPatch {
  pub fn is_active(_trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> RailResult<bool> {
    Ok(!lts_branches(ctx)?.active.is_empty())
  }

  pub fn new(_trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> RailResult<Self> {
    Ok(Self { lts: lts_branches(ctx)? })
  }

  pub fn description(&self) -> String {
    "Cut a new release for an active LTS branch.".to_string()
  }

  /// Ask which LTS line to release; ended lines need an extra confirmation
  fn prompt_for_target_branch(&self, ctx: &ReleaseContext<'_>) -> RailResult<LtsBranch> {
    let choices: Vec<(&LtsBranch, bool)> = self
      .lts
      .active
      .iter()
      .map(|b| (b, true))
      .chain(self.lts.inactive.iter().map(|b| (b, false)))
      .collect();

    let labels: Vec<String> = choices
      .iter()
      .map(|(b, active)| {
        if *active {
          format!("v{} ({})", b.version, b.npm_dist_tag)
        } else {
          format!("v{} ({}, LTS ended)", b.version, b.npm_dist_tag)
        }
      })
      .collect();

    let index = ctx.prompt.select("Please select a version for which you want to cut an LTS patch", &labels)?;
    let (branch, active) = choices
      .get(index)
      .copied()
      .ok_or_else(|| RailError::message(format!("No LTS branch at index {}", index)))?;

    if !active {
      ctx.confirm_or_abort(&format!(
        "Long-term support of \"{}\" has ended. Release a patch anyway?",
        branch.name
      ))?;
    }
    Ok(branch.clone())
  }

  pub fn perform(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    let branch = self.prompt_for_target_branch(ctx)?;
    let new_version = Version::new(branch.version.major, branch.version.minor, branch.version.patch + 1);

    let staging = stage_and_publish(
      ctx,
      &new_version,
      &branch.version,
      &branch.name,
      StagingOptions::default(),
      PublishOptions {
        npm_dist_tag: &branch.npm_dist_tag,
        make_latest: false,
      },
    )?;
    ReleasePipeline::new(ctx).cherry_pick_changelog_into_next_branch(&staging.release_notes, &branch.name)?;
    Ok(())
  }
}

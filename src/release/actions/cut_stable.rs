use super::{EXCEPTIONAL_MINOR_NPM_DIST_TAG, clear_exceptional_minor_marker, stage_and_publish};
use crate::core::context::ReleaseContext;
use crate::core::error::{RailError, RailResult};
use crate::release::dist_tags::{delete_npm_tag_for_packages, set_npm_tag_for_packages};
use crate::release::pipeline::{PublishOptions, ReleasePipeline, StagingOptions};
use crate::versioning::lts::lts_npm_dist_tag;
use crate::versioning::{ActiveReleaseTrains, ReleaseTrain};
use semver::Version;

/// Stable release of the train in release-candidate phase.
///
/// An exceptional minor always takes precedence over the regular
/// release-candidate train.
pub struct CutStable {
  trains: ActiveReleaseTrains,
  train: ReleaseTrain,
  new_version: Version,
}

impl CutStable {
  pub fn is_active(trains: &ActiveReleaseTrains, _ctx: &ReleaseContext<'_>) -> RailResult<bool> {
    let active = match &trains.exceptional_minor {
      Some(em) => em.is_in_phase("rc"),
      None => trains.release_candidate.as_ref().is_some_and(|t| t.is_in_phase("rc")),
    };
    Ok(active)
  }

  pub fn new(trains: &ActiveReleaseTrains) -> RailResult<Self> {
    let train = trains
      .stabilizing_train()
      .cloned()
      .ok_or_else(|| RailError::fatal("No release-candidate train to stabilize."))?;
    let new_version = Version::new(train.version.major, train.version.minor, train.version.patch);
    Ok(Self {
      trains: trains.clone(),
      train,
      new_version,
    })
  }

  pub fn description(&self) -> String {
    format!(
      "Cut a stable release for the \"{}\" branch (v{}).",
      self.train.branch_name, self.new_version
    )
  }

  fn is_exceptional_minor(&self) -> bool {
    self.trains.exceptional_minor.is_some()
  }

  fn assert_exceptional_minor_precedence(&self) -> RailResult<()> {
    if let Some(em) = &self.trains.exceptional_minor {
      if em.branch_name != self.train.branch_name {
        return Err(RailError::fatal(format!(
          "An exceptional minor is active on \"{}\" but the stable release targets \"{}\".",
          em.branch_name, self.train.branch_name
        )));
      }
      if em.is_major {
        return Err(RailError::fatal(format!(
          "The exceptional minor on \"{}\" carries a major version ({}).",
          em.branch_name, em.version
        )));
      }
    }
    Ok(())
  }

  pub fn perform(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    self.assert_exceptional_minor_precedence()?;

    let branch = &self.train.branch_name;
    let is_new_major = self.train.is_major && !self.is_exceptional_minor();
    let staging_options = if self.is_exceptional_minor() {
      StagingOptions {
        update_pkg_json: Some(clear_exceptional_minor_marker),
      }
    } else {
      StagingOptions::default()
    };

    // A new major stays on "next" until it is explicitly tagged as latest
    let staging = stage_and_publish(
      ctx,
      &self.new_version,
      &self.trains.latest.version,
      branch,
      staging_options,
      PublishOptions {
        npm_dist_tag: if is_new_major { "next" } else { "latest" },
        make_latest: !is_new_major,
      },
    )?;

    if is_new_major {
      self.tag_previous_latest_as_lts(ctx)?;
    }

    // The prerelease tag has no use once the exceptional minor is stable
    if self.is_exceptional_minor() {
      let packages = ctx.npm.info()?;
      delete_npm_tag_for_packages(ctx, &packages, EXCEPTIONAL_MINOR_NPM_DIST_TAG)?;
      println!("   ✓ Removed the \"{}\" tag", EXCEPTIONAL_MINOR_NPM_DIST_TAG);
    }

    ReleasePipeline::new(ctx).cherry_pick_changelog_into_next_branch(&staging.release_notes, branch)?;
    Ok(())
  }

  /// Move the previous major onto its `v<major>-lts` tag
  fn tag_previous_latest_as_lts(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    let previous = &self.trains.latest;
    let tag = lts_npm_dist_tag(previous.version.major);

    ReleasePipeline::new(ctx).checkout_upstream_branch(&previous.branch_name)?;
    ctx.npm.install()?;
    let packages = ctx.npm.info()?;
    set_npm_tag_for_packages(ctx, &packages, &tag, &previous.version, true)?;

    println!("   ✓ Tagged v{} release as \"{}\"", previous.version, tag);
    Ok(())
  }
}

//! Registry dist-tag management for the release packages

use crate::core::context::ReleaseContext;
use crate::core::error::{RailError, RailResult};
use crate::npm::NpmPackage;
use crate::ui::progress::PackageProgress;
use crate::versioning::experimental::create_experimental_semver;
use semver::Version;

/// Point `tag` at `version` for every package (experimental ones at their experimental version)
pub fn set_npm_tag_for_packages(
  ctx: &ReleaseContext<'_>,
  packages: &[NpmPackage],
  tag: &str,
  version: &Version,
  skip_experimental: bool,
) -> RailResult<()> {
  let targets: Vec<&NpmPackage> = packages
    .iter()
    .filter(|p| !(skip_experimental && p.experimental))
    .collect();

  let mut progress = PackageProgress::new(targets.len(), format!("Setting \"{}\"", tag));
  for pkg in targets {
    let pkg_version = if pkg.experimental {
      create_experimental_semver(version)
    } else {
      version.clone()
    };
    ctx
      .npm
      .set_dist_tag(&pkg.name, tag, &pkg_version, ctx.registry())
      .map_err(|e| {
        RailError::fatal(format!(
          "Unable to set the \"{}\" tag of {} to {}: {}",
          tag, pkg.name, pkg_version, e
        ))
      })?;
    tracing::info!(package = %pkg.name, tag, version = %pkg_version, "dist tag set");
    progress.inc();
  }
  Ok(())
}

/// Remove `tag` from every package
pub fn delete_npm_tag_for_packages(ctx: &ReleaseContext<'_>, packages: &[NpmPackage], tag: &str) -> RailResult<()> {
  let mut progress = PackageProgress::new(packages.len(), format!("Deleting \"{}\"", tag));
  for pkg in packages {
    ctx
      .npm
      .delete_dist_tag(&pkg.name, tag, ctx.registry())
      .map_err(|e| RailError::fatal(format!("Unable to delete the \"{}\" tag of {}: {}", tag, pkg.name, e)))?;
    tracing::info!(package = %pkg.name, tag, "dist tag deleted");
    progress.inc();
  }
  Ok(())
}

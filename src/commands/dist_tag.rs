use super::Session;
use crate::core::context::ReleaseContext;
use crate::core::error::{RailError, RailResult};
use crate::release::dist_tags::{delete_npm_tag_for_packages, set_npm_tag_for_packages};
use semver::Version;
use std::path::Path;

/// Point `tag` at `version` for every release package of the current checkout
pub fn run_dist_tag_set(root: &Path, tag: &str, version: &str, skip_experimental: bool) -> RailResult<()> {
  let session = Session::open(root)?;
  set_dist_tag(&session.context(), tag, version, skip_experimental)
}

/// Remove `tag` from every release package of the current checkout
pub fn run_dist_tag_delete(root: &Path, tag: &str) -> RailResult<()> {
  let session = Session::open(root)?;
  delete_dist_tag(&session.context(), tag)
}

fn set_dist_tag(ctx: &ReleaseContext<'_>, tag: &str, version: &str, skip_experimental: bool) -> RailResult<()> {
  let version = Version::parse(version.trim_start_matches('v'))
    .map_err(|e| RailError::with_help(format!("Invalid version \"{}\": {}", version, e), "Pass a version such as 12.2.9."))?;

  let packages = ctx.npm.info()?;
  ctx.confirm_or_abort(&format!(
    "Set the \"{}\" tag to v{} for {} packages?",
    tag,
    version,
    packages.len()
  ))?;
  set_npm_tag_for_packages(ctx, &packages, tag, &version, skip_experimental)?;
  println!("✅ Set \"{}\" to v{}", tag, version);
  Ok(())
}

fn delete_dist_tag(ctx: &ReleaseContext<'_>, tag: &str) -> RailResult<()> {
  if tag == "latest" {
    return Err(RailError::with_help(
      "The \"latest\" tag cannot be deleted.",
      "Use `dist-tag set latest <version>` to move it instead.",
    ));
  }

  let packages = ctx.npm.info()?;
  ctx.confirm_or_abort(&format!("Delete the \"{}\" tag from {} packages?", tag, packages.len()))?;
  delete_npm_tag_for_packages(ctx, &packages, tag)?;
  println!("✅ Deleted \"{}\"", tag);
  Ok(())
}

use crate::core::error::{RailError, RailResult};
use crate::release::integrity::compute_hash_for_package_contents;
use std::path::Path;

/// Print the content hash of a build output directory
pub fn run_hash(dir: &Path) -> RailResult<()> {
  if !dir.is_dir() {
    return Err(RailError::with_help(
      format!("{} is not a directory", dir.display()),
      "Pass the output directory of a built package.",
    ));
  }
  let hash = compute_hash_for_package_contents(dir)?;
  println!("{}", hash);
  Ok(())
}

//! Prerelease version arithmetic

use super::release_trains::ReleaseTrain;
use crate::core::error::{RailError, RailResult};
use crate::npm::RegistryPackageInfo;
use semver::{Prerelease, Version};

/// `next.1` -> `next.2`, `rc` -> `rc.0`
pub fn increment_prerelease(version: &Version) -> RailResult<Version> {
  if version.pre.is_empty() {
    return Err(RailError::fatal(format!("Version {} is not a prerelease", version)));
  }

  let mut parts: Vec<String> = version.pre.as_str().split('.').map(|s| s.to_string()).collect();
  let last_numeric = parts.last().and_then(|p| p.parse::<u64>().ok());
  match last_numeric {
    Some(n) => {
      if let Some(last) = parts.last_mut() {
        *last = (n + 1).to_string();
      }
    }
    None => parts.push("0".to_string()),
  }

  let mut bumped = version.clone();
  bumped.pre = Prerelease::new(&parts.join("."))?;
  bumped.build = semver::BuildMetadata::EMPTY;
  Ok(bumped)
}

/// Next prerelease of a train: its own version until that is published
pub fn compute_new_prerelease_version(train: &ReleaseTrain, registry: &RegistryPackageInfo) -> RailResult<Version> {
  if registry.has_version(&train.version) {
    increment_prerelease(&train.version)
  } else {
    Ok(train.version.clone())
  }
}

/// Version to compare against for a train's prerelease notes
pub fn release_notes_compare_version(train: &ReleaseTrain, latest: &ReleaseTrain, registry: &RegistryPackageInfo) -> Version {
  if registry.has_version(&train.version) {
    train.version.clone()
  } else {
    latest.version.clone()
  }
}

/// `x.y.z-rc.0` of a train's version
pub fn release_candidate_of(version: &Version) -> RailResult<Version> {
  let mut rc = Version::new(version.major, version.minor, version.patch);
  rc.pre = Prerelease::new("rc.0")?;
  Ok(rc)
}

/// `x.y.z-next.0`
pub fn next_prerelease_of(major: u64, minor: u64) -> RailResult<Version> {
  let mut next = Version::new(major, minor, 0);
  next.pre = Prerelease::new("next.0")?;
  Ok(next)
}

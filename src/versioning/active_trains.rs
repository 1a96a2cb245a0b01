//! Derivation of the active release trains from upstream branches
//!
//! Branch versions are always read through the code host, never from the local
//! clone, so a stale checkout cannot change which trains are considered active.

use super::lts::LtsBranches;
use super::release_trains::{ActiveReleaseTrains, ReleaseTrain};
use super::version_branches::{BranchVersion, VersionBranch, get_version_branches, get_version_of_branch};
use crate::core::config::RailConfig;
use crate::core::error::{RailError, RailResult, check_unauthorized};
use crate::github::CodeHostClient;
use semver::Version;

/// Fetch the active release trains of the upstream repository
pub fn fetch_active_release_trains(github: &dyn CodeHostClient, config: &RailConfig) -> RailResult<ActiveReleaseTrains> {
  let pkg_path = &config.release.package_json_path;
  let next_branch = &config.github.main_branch;

  let next_version = get_version_of_branch(github, pkg_path, next_branch)?.version;
  let next = ReleaseTrain::new(next_branch.clone(), next_version);

  let branch_names = github.list_branches().map_err(check_unauthorized)?;
  let branches = get_version_branches(&branch_names);

  tracing::debug!(count = branches.len(), "discovered version branches");

  determine_active_release_trains(next, &branches, |branch| {
    get_version_of_branch(github, pkg_path, branch)
  })
}

/// Classify version branches (most recent first) relative to the `next` train.
///
/// Stops at the first branch that is neither exceptional minor nor in
/// feature-freeze/release-candidate phase: that branch is `latest`.
pub fn determine_active_release_trains(
  next: ReleaseTrain,
  branches: &[VersionBranch],
  mut version_of: impl FnMut(&str) -> RailResult<BranchVersion>,
) -> RailResult<ActiveReleaseTrains> {
  let next_train_version = Version::new(next.version.major, next.version.minor, 0);

  let mut latest: Option<ReleaseTrain> = None;
  let mut release_candidate: Option<ReleaseTrain> = None;
  let mut exceptional_minor: Option<ReleaseTrain> = None;

  for branch in branches {
    if branch.parsed > next_train_version {
      return Err(RailError::fatal(format!(
        "Discovered unexpected version-branch \"{}\" for a release-train that is more recent than the release-train currently in the \"{}\" branch.",
        branch.name, next.branch_name
      )));
    }
    if branch.parsed == next_train_version {
      return Err(RailError::fatal(format!(
        "Discovered unexpected version-branch \"{}\" for a release-train that is already active in the \"{}\" branch.",
        branch.name, next.branch_name
      )));
    }

    let BranchVersion {
      version,
      is_exceptional_minor,
    } = version_of(&branch.name)?;
    let train = ReleaseTrain::new(branch.name.clone(), version);
    let is_prerelease = train.is_in_phase("rc") || train.is_in_phase("next");

    if is_exceptional_minor {
      if exceptional_minor.is_some() {
        return Err(RailError::fatal(format!(
          "Unable to determine latest release-train. Found two consecutive branches marked as exceptional minor: \"{}\"",
          branch.name
        )));
      }
      if latest.is_some() {
        return Err(RailError::fatal(format!(
          "Unable to determine latest release-train. Found an exceptional minor (\"{}\") older than the latest release-train.",
          branch.name
        )));
      }
      exceptional_minor = Some(train);
      continue;
    }

    if is_prerelease {
      if exceptional_minor.is_some() {
        return Err(RailError::fatal(format!(
          "Unable to determine latest release-train. Found a feature-freeze/release-candidate branch (\"{}\") older than the exceptional minor.",
          branch.name
        )));
      }
      if release_candidate.is_some() {
        return Err(RailError::fatal(format!(
          "Unable to determine latest release-train. Found two consecutive branches in feature-freeze/release-candidate phase: \"{}\"",
          branch.name
        )));
      }
      if train.version.major == 0 {
        return Err(RailError::fatal(format!(
          "Found feature-freeze/release-candidate branch \"{}\" for a 0.x major, which is not supported.",
          branch.name
        )));
      }
      release_candidate = Some(train);
      continue;
    }

    latest = Some(train);
    break;
  }

  let Some(latest) = latest else {
    let considered: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
    return Err(RailError::fatal_with_help(
      format!(
        "Unable to determine the latest release-train. The following branches have been considered: [{}]",
        considered.join(", ")
      ),
      "Every project needs at least one stable `<major>.<minor>.x` branch.",
    ));
  };

  Ok(ActiveReleaseTrains {
    latest,
    release_candidate,
    exceptional_minor,
    next,
  })
}

/// Print the active trains (and LTS branches when known)
pub fn print_active_release_trains(trains: &ActiveReleaseTrains, lts: Option<&LtsBranches>) {
  println!("🚂 Active release trains:");
  print_train("next", Some(&trains.next));
  print_train("release-candidate", trains.release_candidate.as_ref());
  print_train("exceptional minor", trains.exceptional_minor.as_ref());
  print_train("latest", Some(&trains.latest));

  if let Some(lts) = lts {
    if lts.active.is_empty() {
      println!("   LTS: no active long-term support branches");
    }
    for branch in &lts.active {
      println!(
        "   LTS: {} ({}, npm tag {})",
        branch.name, branch.version, branch.npm_dist_tag
      );
    }
    for branch in &lts.inactive {
      println!("   LTS (ended): {} ({})", branch.name, branch.version);
    }
  }
  println!();
}

fn print_train(label: &str, train: Option<&ReleaseTrain>) {
  match train {
    Some(train) => {
      let phase = match train.prerelease_phase() {
        Some("next") => " (feature-freeze)",
        Some("rc") => " (release-candidate)",
        _ => "",
      };
      println!("   {:<18} {} -> v{}{}", label, train.branch_name, train.version, phase);
    }
    None => println!("   {:<18} -", label),
  }
}

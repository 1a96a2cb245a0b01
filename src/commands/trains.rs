use super::Session;
use crate::core::context::ReleaseContext;
use crate::core::error::RailResult;
use crate::versioning::lts::{LtsBranches, fetch_long_term_support_branches};
use crate::versioning::{ActiveReleaseTrains, fetch_active_release_trains, fetch_project_registry_info, print_active_release_trains};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;

/// Active trains plus LTS lines, as printed by `trains --json`
#[derive(Debug, Serialize)]
pub struct TrainsReport {
  pub trains: ActiveReleaseTrains,
  pub lts: LtsBranches,
}

/// Print the active release trains
pub fn run_trains(root: &Path, json: bool) -> RailResult<()> {
  let session = Session::open(root)?;
  let report = collect_trains(&session.context())?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_active_release_trains(&report.trains, Some(&report.lts));
  }
  Ok(())
}

pub fn collect_trains(ctx: &ReleaseContext<'_>) -> RailResult<TrainsReport> {
  let trains = fetch_active_release_trains(ctx.github, ctx.config)?;
  let registry = fetch_project_registry_info(ctx.npm, ctx.config)?;
  let lts = fetch_long_term_support_branches(&registry, Utc::now())?;
  Ok(TrainsReport { trains, lts })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestHarness;

  #[test]
  fn test_report_serializes_camel_case() {
    let h = TestHarness::new();
    h.github.set_branch_version("main", "13.1.0-next.0");
    h.github.set_branch_version("13.0.x", "13.0.0-rc.1");
    h.github.set_branch_version("12.2.x", "12.2.9");

    let report = collect_trains(&h.context()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["trains"]["releaseCandidate"]["branchName"], "13.0.x");
    assert_eq!(json["trains"]["latest"]["version"], "12.2.9");
    assert!(json["trains"]["exceptionalMinor"].is_null());
    assert_eq!(json["lts"]["active"].as_array().unwrap().len(), 0);
  }
}

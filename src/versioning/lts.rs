//! Long-term support branches
//!
//! A major stays in long-term support for 6 months of active support plus 12
//! months of LTS after its `<major>.0.0` release. LTS lines are discovered from
//! the `v<major>-lts` dist tags of the representative registry package.

use super::version_branches::version_branch_name;
use crate::core::error::{RailError, RailResult};
use crate::npm::RegistryPackageInfo;
use chrono::{DateTime, Months, Utc};
use regex::Regex;
use semver::Version;
use serde::Serialize;
use std::sync::OnceLock;

/// Months of active support after a major release
pub const MAJOR_ACTIVE_SUPPORT_MONTHS: u32 = 6;

/// Months of long-term support following active support
pub const MAJOR_LTS_MONTHS: u32 = 12;

fn lts_tag_regex() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"^v(\d+)-lts$").expect("valid lts tag regex"))
}

/// Dist tag for the LTS line of `major`
pub fn lts_npm_dist_tag(major: u64) -> String {
  format!("v{}-lts", major)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LtsBranch {
  pub name: String,
  pub version: Version,
  pub npm_dist_tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LtsBranches {
  pub active: Vec<LtsBranch>,
  pub inactive: Vec<LtsBranch>,
}

/// End of long-term support for a major released at `release_date`
pub fn compute_lts_end_date(release_date: DateTime<Utc>) -> Option<DateTime<Utc>> {
  release_date.checked_add_months(Months::new(MAJOR_ACTIVE_SUPPORT_MONTHS + MAJOR_LTS_MONTHS))
}

/// Release date of `<major>.0.0` as recorded by the registry
fn major_release_date(info: &RegistryPackageInfo, major: u64) -> RailResult<DateTime<Utc>> {
  let key = format!("{}.0.0", major);
  let raw = info.time.get(&key).ok_or_else(|| {
    RailError::fatal(format!(
      "No release date recorded in the registry for v{}. Unable to determine the LTS window.",
      key
    ))
  })?;
  DateTime::parse_from_rfc3339(raw)
    .map(|d| d.with_timezone(&Utc))
    .map_err(|e| RailError::fatal(format!("Invalid release date \"{}\" for v{}: {}", raw, key, e)))
}

/// Split the LTS dist tags of the registry document into active and ended lines (most recent major first)
pub fn fetch_long_term_support_branches(info: &RegistryPackageInfo, now: DateTime<Utc>) -> RailResult<LtsBranches> {
  let mut branches = LtsBranches::default();

  let mut tagged: Vec<(u64, &String)> = info
    .dist_tags
    .iter()
    .filter_map(|(tag, version)| {
      let major = lts_tag_regex().captures(tag)?[1].parse().ok()?;
      Some((major, version))
    })
    .collect();
  tagged.sort_by(|a, b| b.0.cmp(&a.0));

  for (major, raw_version) in tagged {
    let version = Version::parse(raw_version)?;
    let end = compute_lts_end_date(major_release_date(info, major)?)
      .ok_or_else(|| RailError::fatal(format!("LTS end date of v{} is out of range", major)))?;

    let branch = LtsBranch {
      name: version_branch_name(&version),
      version,
      npm_dist_tag: lts_npm_dist_tag(major),
    };

    if now < end {
      branches.active.push(branch);
    } else {
      branches.inactive.push(branch);
    }
  }

  Ok(branches)
}

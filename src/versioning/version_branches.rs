//! Version branch discovery (`<major>.<minor>.x`)

use crate::core::error::{RailError, RailResult, ResultExt, check_unauthorized};
use crate::github::CodeHostClient;
use regex::Regex;
use semver::Version;
use std::path::Path;
use std::sync::OnceLock;

/// `package.json` field marking a branch as exceptional minor
pub const EXCEPTIONAL_MINOR_MARKER: &str = "__exceptionalMinor__";

fn version_branch_regex() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"^(\d+)\.(\d+)\.x$").expect("valid version branch regex"))
}

/// A branch named `<major>.<minor>.x`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBranch {
  pub name: String,
  /// `<major>.<minor>.0`
  pub parsed: Version,
}

/// Version a version branch name stands for (`12.1.x` -> `12.1.0`)
pub fn version_of_branch_name(name: &str) -> Option<Version> {
  let captures = version_branch_regex().captures(name)?;
  let major = captures[1].parse().ok()?;
  let minor = captures[2].parse().ok()?;
  Some(Version::new(major, minor, 0))
}

/// Branch name for the train a version belongs to
pub fn version_branch_name(version: &Version) -> String {
  format!("{}.{}.x", version.major, version.minor)
}

/// Version branches among `branch_names`, most recent first
pub fn get_version_branches(branch_names: &[String]) -> Vec<VersionBranch> {
  let mut branches: Vec<VersionBranch> = branch_names
    .iter()
    .filter_map(|name| {
      version_of_branch_name(name).map(|parsed| VersionBranch {
        name: name.clone(),
        parsed,
      })
    })
    .collect();
  branches.sort_by(|a, b| b.parsed.cmp(&a.parsed));
  branches
}

/// Version information of a branch, read from its `package.json`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchVersion {
  pub version: Version,
  pub is_exceptional_minor: bool,
}

/// Parse the version and exceptional-minor marker out of `package.json` contents
pub fn parse_branch_version(branch: &str, package_json: &str) -> RailResult<BranchVersion> {
  let pkg: serde_json::Value = serde_json::from_str(package_json)
    .with_context(|| format!("Unable to parse package.json of branch \"{}\"", branch))?;

  let raw = pkg.get("version").and_then(|v| v.as_str()).ok_or_else(|| {
    RailError::fatal(format!(
      "Unable to read the version of branch \"{}\": package.json has no version",
      branch
    ))
  })?;
  let version = Version::parse(raw).map_err(|e| {
    RailError::fatal(format!(
      "Invalid version \"{}\" detected in package.json of branch \"{}\": {}",
      raw, branch, e
    ))
  })?;

  let is_exceptional_minor = pkg
    .get(EXCEPTIONAL_MINOR_MARKER)
    .and_then(|v| v.as_bool())
    .unwrap_or(false);

  Ok(BranchVersion {
    version,
    is_exceptional_minor,
  })
}

/// Read the version of an upstream branch through the code host
pub fn get_version_of_branch(github: &dyn CodeHostClient, package_json_path: &Path, branch: &str) -> RailResult<BranchVersion> {
  let path = package_json_path.to_string_lossy();
  let contents = github.get_file_contents(&path, branch).map_err(check_unauthorized)?;
  parse_branch_version(branch, &contents)
}

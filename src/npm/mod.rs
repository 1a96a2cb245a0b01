//! Package manager and registry seam
//!
//! Building, inspecting and publishing the release packages happens through
//! [`PackageManagerClient`]. [`SystemPackageManager`] shells out to the
//! configured script runner and `npm`.

pub mod system;

use crate::core::error::RailResult;
use crate::release::integrity::BuiltPackageWithInfo;
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use system::SystemPackageManager;

/// Package produced by the release build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltPackage {
  pub name: String,
  pub output_path: PathBuf,
}

/// Release package metadata reported by the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpmPackage {
  pub name: String,
  /// Experimental packages are versioned `0.<major*100+minor>.<patch>` and never get LTS tags
  #[serde(default)]
  pub experimental: bool,
}

/// Subset of a registry package document
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistryPackageInfo {
  #[serde(rename = "dist-tags", default)]
  pub dist_tags: BTreeMap<String, String>,
  #[serde(default, deserialize_with = "one_or_many")]
  pub versions: Vec<String>,
  /// Publish timestamps keyed by version (plus `created`/`modified`)
  #[serde(default)]
  pub time: BTreeMap<String, String>,
}

impl RegistryPackageInfo {
  pub fn has_version(&self, version: &Version) -> bool {
    let version = version.to_string();
    self.versions.iter().any(|v| *v == version)
  }
}

/// `npm view --json` collapses single-element arrays to a bare string
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum OneOrMany {
    One(String),
    Many(Vec<String>),
  }

  Ok(match OneOrMany::deserialize(deserializer)? {
    OneOrMany::One(v) => vec![v],
    OneOrMany::Many(v) => v,
  })
}

/// Payload handed to the project's release precheck
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecheckPayload<'a> {
  pub new_version: String,
  pub built_packages_with_info: &'a [BuiltPackageWithInfo],
}

/// Operations the release flow needs from the package manager and registry
pub trait PackageManagerClient {
  /// Install dependencies for the currently checked-out revision
  fn install(&self) -> RailResult<()>;

  /// Build all release packages
  fn build(&self) -> RailResult<Vec<BuiltPackage>>;

  /// Release packages known to the currently checked-out revision
  fn info(&self) -> RailResult<Vec<NpmPackage>>;

  /// Project-specific validation of the release output
  fn precheck(&self, payload: &PrecheckPayload<'_>) -> RailResult<()>;

  fn publish(&self, package_path: &Path, dist_tag: &str, registry: Option<&str>) -> RailResult<()>;

  fn set_dist_tag(&self, package: &str, tag: &str, version: &Version, registry: Option<&str>) -> RailResult<()>;

  fn delete_dist_tag(&self, package: &str, tag: &str, registry: Option<&str>) -> RailResult<()>;

  fn registry_info(&self, package: &str, registry: Option<&str>) -> RailResult<RegistryPackageInfo>;

  /// Logged-in registry user, if any
  fn whoami(&self, registry: Option<&str>) -> RailResult<Option<String>>;
}

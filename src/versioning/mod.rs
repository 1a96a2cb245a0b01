//! Release-train model
//!
//! - **release_trains**: `ReleaseTrain` / `ActiveReleaseTrains`
//! - **version_branches**: `<major>.<minor>.x` branch discovery and `package.json` versions
//! - **active_trains**: classification of branches into the active trains
//! - **lts**: long-term support lines from registry dist tags
//! - **experimental**: version mapping for experimental packages
//! - **prerelease**: prerelease bumps and release-notes compare versions

pub mod active_trains;
pub mod experimental;
pub mod lts;
pub mod prerelease;
pub mod release_trains;
pub mod version_branches;

pub use active_trains::{fetch_active_release_trains, print_active_release_trains};
pub use release_trains::{ActiveReleaseTrains, ReleaseTrain};

use crate::core::config::RailConfig;
use crate::core::error::{RailResult, ResultExt};
use crate::npm::{PackageManagerClient, RegistryPackageInfo};

/// Registry document of the package representing the whole project
pub fn fetch_project_registry_info(npm: &dyn PackageManagerClient, config: &RailConfig) -> RailResult<RegistryPackageInfo> {
  let package = &config.release.representative_npm_package;
  npm
    .registry_info(package, config.release.publish_registry.as_deref())
    .with_context(|| format!("Unable to fetch registry information of {}", package))
}

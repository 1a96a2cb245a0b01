use crate::core::context::ReleaseContext;
use crate::core::error::{RailResult, check_unauthorized};
use crate::github::ReleaseUpdate;
use crate::release::dist_tags::set_npm_tag_for_packages;
use crate::release::pipeline::ReleasePipeline;
use crate::versioning::fetch_project_registry_info;
use crate::versioning::{ActiveReleaseTrains, ReleaseTrain};
use semver::Version;

/// Promote a freshly stabilized major from `next` to `latest`
pub struct TagRecentMajorAsLatest {
  latest: ReleaseTrain,
}

impl TagRecentMajorAsLatest {
  /// Active while the latest train is `x.0.0` and the registry still points `latest` at `x-1`
  pub fn is_active(trains: &ActiveReleaseTrains, ctx: &ReleaseContext<'_>) -> RailResult<bool> {
    let latest = &trains.latest.version;
    if latest.minor != 0 || latest.patch != 0 || !latest.pre.is_empty() || latest.major == 0 {
      return Ok(false);
    }

    let registry = fetch_project_registry_info(ctx.npm, ctx.config)?;
    let Some(tagged) = registry.dist_tags.get("latest") else {
      return Ok(false);
    };
    let Ok(tagged) = Version::parse(tagged) else {
      tracing::warn!(version = %tagged, "registry \"latest\" tag is not a valid version");
      return Ok(false);
    };
    Ok(tagged.major == latest.major - 1)
  }

  pub fn new(trains: &ActiveReleaseTrains) -> Self {
    Self {
      latest: trains.latest.clone(),
    }
  }

  pub fn description(&self) -> String {
    format!(
      "Retag recently published major v{} as \"latest\" in the registry.",
      self.latest.version
    )
  }

  pub fn perform(&self, ctx: &ReleaseContext<'_>) -> RailResult<()> {
    let version = &self.latest.version;

    ReleasePipeline::new(ctx).checkout_upstream_branch(&self.latest.branch_name)?;
    ctx.npm.install()?;
    let packages = ctx.npm.info()?;
    set_npm_tag_for_packages(ctx, &packages, "latest", version, false)?;

    let release = ctx
      .github
      .get_release_by_tag(&version.to_string())
      .map_err(check_unauthorized)?;
    ctx
      .github
      .update_release(
        release.id,
        &ReleaseUpdate {
          prerelease: Some(false),
          make_latest: Some(true),
        },
      )
      .map_err(check_unauthorized)?;

    println!("✅ Tagged v{} as \"latest\"", version);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::npm::NpmPackage;
  use crate::testing::TestHarness;

  #[test]
  fn test_experimental_packages_included_and_release_marked_latest() {
    let h = TestHarness::new();
    h.npm.set_packages(vec![
      NpmPackage {
        name: "@acme/core".into(),
        experimental: false,
      },
      NpmPackage {
        name: "@acme/labs".into(),
        experimental: true,
      },
    ]);
    let trains = ActiveReleaseTrains {
      latest: ReleaseTrain::new("13.0.x", Version::parse("13.0.0").unwrap()),
      release_candidate: None,
      exceptional_minor: None,
      next: ReleaseTrain::new("main", Version::parse("13.1.0-next.0").unwrap()),
    };
    let ctx = h.context();

    TagRecentMajorAsLatest::new(&trains).perform(&ctx).unwrap();

    assert_eq!(
      h.npm.dist_tags(),
      vec![
        ("@acme/core".to_string(), "latest".to_string(), "13.0.0".to_string()),
        ("@acme/labs".to_string(), "latest".to_string(), "0.1300.0".to_string()),
      ]
    );
    let updates = h.github.release_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, 99);
    assert_eq!(updates[0].1.prerelease, Some(false));
    assert_eq!(updates[0].1.make_latest, Some(true));
  }
}

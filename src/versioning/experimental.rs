use semver::Version;

/// Experimental packages ship as `0.<major*100+minor>.<patch>` with the same prerelease
pub fn create_experimental_semver(version: &Version) -> Version {
  let mut experimental = Version::new(0, version.major * 100 + version.minor, version.patch);
  experimental.pre = version.pre.clone();
  experimental
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_experimental_semver() {
    let v = |s| Version::parse(s).unwrap();
    assert_eq!(create_experimental_semver(&v("13.2.4")), v("0.1302.4"));
    assert_eq!(create_experimental_semver(&v("13.0.0-rc.1")), v("0.1300.0-rc.1"));
  }
}

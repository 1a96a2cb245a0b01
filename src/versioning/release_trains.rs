use semver::Version;
use serde::Serialize;

/// A maintained branch and the version it currently carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseTrain {
  pub branch_name: String,
  pub version: Version,
  /// `x.0.0` (any prerelease)
  pub is_major: bool,
}

impl ReleaseTrain {
  pub fn new(branch_name: impl Into<String>, version: Version) -> Self {
    let is_major = version.minor == 0 && version.patch == 0;
    Self {
      branch_name: branch_name.into(),
      version,
      is_major,
    }
  }

  /// First prerelease identifier (`next`, `rc`, ...), if any
  pub fn prerelease_phase(&self) -> Option<&str> {
    prerelease_phase(&self.version)
  }

  /// Whether the train is in the feature-freeze (`next`) or release-candidate (`rc`) phase
  pub fn is_in_phase(&self, phase: &str) -> bool {
    self.prerelease_phase() == Some(phase)
  }
}

/// First dot-separated identifier of the prerelease part
pub fn prerelease_phase(version: &Version) -> Option<&str> {
  if version.pre.is_empty() {
    return None;
  }
  version.pre.as_str().split('.').next()
}

/// The release trains that are currently maintained
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveReleaseTrains {
  /// Most recently stabilized line
  pub latest: ReleaseTrain,
  /// Train in feature-freeze or release-candidate phase
  pub release_candidate: Option<ReleaseTrain>,
  /// Out-of-band minor that takes precedence over `release_candidate`
  pub exceptional_minor: Option<ReleaseTrain>,
  /// Primary development branch
  pub next: ReleaseTrain,
}

impl ActiveReleaseTrains {
  /// Train a stable cut applies to: the exceptional minor whenever one exists
  pub fn stabilizing_train(&self) -> Option<&ReleaseTrain> {
    self.exceptional_minor.as_ref().or(self.release_candidate.as_ref())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
  }

  #[test]
  fn test_is_major() {
    assert!(ReleaseTrain::new("main", v("13.0.0-next.2")).is_major);
    assert!(!ReleaseTrain::new("12.2.x", v("12.2.1")).is_major);
    assert!(!ReleaseTrain::new("12.1.x", v("12.1.0")).is_major);
  }

  #[test]
  fn test_prerelease_phase() {
    let train = ReleaseTrain::new("13.0.x", v("13.0.0-rc.1"));
    assert_eq!(train.prerelease_phase(), Some("rc"));
    assert!(train.is_in_phase("rc"));
    assert!(!train.is_in_phase("next"));
    assert_eq!(prerelease_phase(&v("1.0.0")), None);
  }

  #[test]
  fn test_stabilizing_train_prefers_exceptional_minor() {
    let mut trains = ActiveReleaseTrains {
      latest: ReleaseTrain::new("12.1.x", v("12.1.4")),
      release_candidate: Some(ReleaseTrain::new("13.0.x", v("13.0.0-rc.0"))),
      exceptional_minor: None,
      next: ReleaseTrain::new("main", v("13.1.0-next.0")),
    };
    assert_eq!(trains.stabilizing_train().unwrap().branch_name, "13.0.x");

    trains.exceptional_minor = Some(ReleaseTrain::new("12.2.x", v("12.2.0-rc.0")));
    assert_eq!(trains.stabilizing_train().unwrap().branch_name, "12.2.x");
  }
}

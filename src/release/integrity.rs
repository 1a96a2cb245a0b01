//! Built-package integrity
//!
//! Every built package directory is hashed while staging. Right before
//! publishing, the hashes are recomputed and the on-disk versions re-checked,
//! so nothing reaches the registry that differs from what was reviewed.

use crate::core::error::{RailError, RailResult, ResultExt};
use crate::npm::{BuiltPackage, NpmPackage};
use crate::versioning::experimental::create_experimental_semver;
use rayon::prelude::*;
use semver::Version;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Built package joined with its project metadata and content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltPackageWithInfo {
  pub name: String,
  pub output_path: PathBuf,
  pub experimental: bool,
  /// SHA-256 over the output directory
  pub hash: String,
}

impl BuiltPackageWithInfo {
  /// Version this package must carry when the project is released as `version`
  pub fn expected_version(&self, version: &Version) -> Version {
    if self.experimental {
      create_experimental_semver(version)
    } else {
      version.clone()
    }
  }
}

/// Kind of a hashed directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
  Dir,
  File,
  Symlink,
}

impl EntryKind {
  fn marker(self) -> u8 {
    match self {
      EntryKind::Dir => b'd',
      EntryKind::File => b'f',
      EntryKind::Symlink => b'l',
    }
  }
}

/// Length-prefixed so that no two trees share an encoding
fn update_framed(hasher: &mut Sha256, bytes: &[u8]) {
  hasher.update((bytes.len() as u64).to_le_bytes());
  hasher.update(bytes);
}

/// SHA-256 over every entry below `dir`, sorted by relative path.
///
/// Each entry contributes a kind marker and its `/`-separated relative path.
/// Files add their contents, symlinks their target. Paths and payloads are
/// length-prefixed.
pub fn compute_hash_for_package_contents(dir: &Path) -> RailResult<String> {
  let mut entries: Vec<(String, EntryKind, PathBuf)> = Vec::new();
  for entry in WalkDir::new(dir).follow_links(false).min_depth(1) {
    let entry = entry?;
    let file_type = entry.file_type();
    let kind = if file_type.is_symlink() {
      EntryKind::Symlink
    } else if file_type.is_dir() {
      EntryKind::Dir
    } else if file_type.is_file() {
      EntryKind::File
    } else {
      continue;
    };
    let relative = entry
      .path()
      .strip_prefix(dir)
      .unwrap_or(entry.path())
      .components()
      .map(|c| c.as_os_str().to_string_lossy())
      .collect::<Vec<_>>()
      .join("/");
    entries.push((relative, kind, entry.into_path()));
  }
  entries.sort_by(|a, b| a.0.cmp(&b.0));

  let mut hasher = Sha256::new();
  for (relative, kind, path) in &entries {
    hasher.update([kind.marker()]);
    update_framed(&mut hasher, relative.as_bytes());
    match kind {
      EntryKind::Dir => {}
      EntryKind::File => {
        let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        update_framed(&mut hasher, &content);
      }
      EntryKind::Symlink => {
        let target = fs::read_link(path).with_context(|| format!("Failed to read link {}", path.display()))?;
        update_framed(&mut hasher, target.to_string_lossy().as_bytes());
      }
    }
  }
  Ok(format!("{:x}", hasher.finalize()))
}

/// Join build output with package info and hash every package
pub fn analyze_and_extend_built_packages(
  built: Vec<BuiltPackage>,
  info: &[NpmPackage],
) -> RailResult<Vec<BuiltPackageWithInfo>> {
  built
    .into_par_iter()
    .map(|pkg| -> RailResult<BuiltPackageWithInfo> {
      let package_info = info.iter().find(|i| i.name == pkg.name).ok_or_else(|| {
        RailError::fatal(format!(
          "Unable to find package information for built package \"{}\".",
          pkg.name
        ))
      })?;
      let hash = compute_hash_for_package_contents(&pkg.output_path)?;
      Ok(BuiltPackageWithInfo {
        name: pkg.name,
        output_path: pkg.output_path,
        experimental: package_info.experimental,
        hash,
      })
    })
    .collect()
}

/// Recompute every package hash and compare with the staged one
pub fn assert_integrity(packages: &[BuiltPackageWithInfo]) -> RailResult<()> {
  let unchanged = packages
    .par_iter()
    .map(|pkg| -> RailResult<bool> { Ok(compute_hash_for_package_contents(&pkg.output_path)? == pkg.hash) })
    .collect::<RailResult<Vec<bool>>>()?;

  let modified: Vec<&str> = packages
    .iter()
    .zip(unchanged)
    .filter(|(_, unchanged)| !unchanged)
    .map(|(pkg, _)| pkg.name.as_str())
    .collect();

  if !modified.is_empty() {
    return Err(RailError::fatal_with_help(
      format!(
        "Release output has been modified locally since it was built: {}",
        modified.join(", ")
      ),
      "Discard local changes to the build output and restart the release.",
    ));
  }
  Ok(())
}

/// Version recorded in `<output>/package.json`
fn read_built_version(pkg: &BuiltPackageWithInfo) -> RailResult<Version> {
  let path = pkg.output_path.join("package.json");
  let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
  let json: serde_json::Value = serde_json::from_str(&content)?;
  let raw = json
    .get("version")
    .and_then(|v| v.as_str())
    .ok_or_else(|| RailError::fatal(format!("Built package \"{}\" has no version", pkg.name)))?;
  Ok(Version::parse(raw)?)
}

/// Every built package must carry the version being released
pub fn assert_matching_versions(packages: &[BuiltPackageWithInfo], version: &Version) -> RailResult<()> {
  let mut mismatches = Vec::new();
  for pkg in packages {
    let expected = pkg.expected_version(version);
    let actual = read_built_version(pkg)?;
    if actual != expected {
      mismatches.push(format!("{} (expected {}, found {})", pkg.name, expected, actual));
    }
  }

  if !mismatches.is_empty() {
    return Err(RailError::fatal(format!(
      "Built packages do not match the expected version {}:\n  {}",
      version,
      mismatches.join("\n  ")
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn write_package(dir: &Path, version: &str) {
    fs::create_dir_all(dir.join("lib")).unwrap();
    fs::write(dir.join("package.json"), format!("{{\"name\":\"a\",\"version\":\"{}\"}}", version)).unwrap();
    fs::write(dir.join("lib/index.js"), "export const a = 1;\n").unwrap();
  }

  fn with_info(dir: &Path, experimental: bool) -> BuiltPackageWithInfo {
    BuiltPackageWithInfo {
      name: "a".to_string(),
      output_path: dir.to_path_buf(),
      experimental,
      hash: compute_hash_for_package_contents(dir).unwrap(),
    }
  }

  #[test]
  fn test_hash_is_idempotent_and_content_sensitive() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path(), "1.2.3");

    let first = compute_hash_for_package_contents(dir.path()).unwrap();
    let second = compute_hash_for_package_contents(dir.path()).unwrap();
    assert_eq!(first, second);

    fs::write(dir.path().join("lib/index.js"), "export const a = 2;\n").unwrap();
    assert_ne!(first, compute_hash_for_package_contents(dir.path()).unwrap());
  }

  #[test]
  fn test_hash_covers_file_names() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path(), "1.2.3");
    let before = compute_hash_for_package_contents(dir.path()).unwrap();
    fs::rename(dir.path().join("lib/index.js"), dir.path().join("lib/main.js")).unwrap();
    assert_ne!(before, compute_hash_for_package_contents(dir.path()).unwrap());
  }

  #[test]
  fn test_hash_distinguishes_merged_files() {
    let split = tempfile::tempdir().unwrap();
    fs::write(split.path().join("a.js"), "foo").unwrap();
    fs::write(split.path().join("b.js"), "bar").unwrap();

    let merged = tempfile::tempdir().unwrap();
    fs::write(merged.path().join("a.js"), "foob.jsbar").unwrap();

    assert_ne!(
      compute_hash_for_package_contents(split.path()).unwrap(),
      compute_hash_for_package_contents(merged.path()).unwrap()
    );
  }

  #[test]
  fn test_hash_covers_empty_directories() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path(), "1.2.3");
    let before = compute_hash_for_package_contents(dir.path()).unwrap();

    fs::create_dir(dir.path().join("empty")).unwrap();
    let with_dir = compute_hash_for_package_contents(dir.path()).unwrap();
    assert_ne!(before, with_dir);

    fs::remove_dir(dir.path().join("empty")).unwrap();
    assert_eq!(before, compute_hash_for_package_contents(dir.path()).unwrap());
  }

  #[cfg(unix)]
  #[test]
  fn test_hash_covers_symlinks() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path(), "1.2.3");
    let before = compute_hash_for_package_contents(dir.path()).unwrap();

    std::os::unix::fs::symlink("lib/index.js", dir.path().join("main.js")).unwrap();
    let linked = compute_hash_for_package_contents(dir.path()).unwrap();
    assert_ne!(before, linked);

    fs::remove_file(dir.path().join("main.js")).unwrap();
    std::os::unix::fs::symlink("package.json", dir.path().join("main.js")).unwrap();
    assert_ne!(linked, compute_hash_for_package_contents(dir.path()).unwrap());
  }

  #[test]
  fn test_assert_integrity_detects_modification() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path(), "1.2.3");
    let pkgs = vec![with_info(dir.path(), false)];
    assert!(assert_integrity(&pkgs).is_ok());

    fs::write(dir.path().join("lib/extra.js"), "tampered").unwrap();
    let err = assert_integrity(&pkgs).unwrap_err();
    assert!(err.is_fatal());
  }

  #[test]
  fn test_matching_versions() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path(), "1.2.3");
    let pkgs = vec![with_info(dir.path(), false)];

    assert!(assert_matching_versions(&pkgs, &Version::new(1, 2, 3)).is_ok());
    assert!(assert_matching_versions(&pkgs, &Version::new(1, 2, 4)).unwrap_err().is_fatal());
  }

  #[test]
  fn test_experimental_packages_expect_experimental_version() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path(), "0.1302.4");
    let pkgs = vec![with_info(dir.path(), true)];
    assert!(assert_matching_versions(&pkgs, &Version::new(13, 2, 4)).is_ok());
  }

  #[test]
  fn test_missing_package_info_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path(), "1.2.3");
    let built = vec![BuiltPackage {
      name: "a".to_string(),
      output_path: dir.path().to_path_buf(),
    }];
    let err = analyze_and_extend_built_packages(built, &[]).unwrap_err();
    assert!(err.is_fatal());

    let info = vec![NpmPackage {
      name: "a".to_string(),
      experimental: false,
    }];
    let built = vec![BuiltPackage {
      name: "a".to_string(),
      output_path: dir.path().to_path_buf(),
    }];
    let pkgs = analyze_and_extend_built_packages(built, &info).unwrap();
    assert_eq!(pkgs[0].hash.len(), 64);
  }
}

//! Tests for configuration discovery and validation

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_missing_config_is_a_user_error() -> Result<()> {
  let project = TestProject::new()?;
  let output = run_release_train(&project.path, &["trains"])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("No release-train configuration found"));
  Ok(())
}

#[test]
fn test_invalid_merge_method_rejected() -> Result<()> {
  let project = TestProject::new()?;
  project.write_file(
    "release-train.toml",
    &format!("{}merge_method = \"octopus\"\n", CONFIG),
  )?;

  let output = run_release_train(&project.path, &["trains"])?;
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}

#[test]
fn test_outside_git_repository() -> Result<()> {
  let temp = tempfile::TempDir::new()?;
  let output = run_release_train(temp.path(), &["publish"])?;
  assert!(!output.status.success());
  Ok(())
}

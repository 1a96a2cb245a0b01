//! Tests for the `publish` pre-checks

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_publish_refuses_uncommitted_changes() -> Result<()> {
  let project = TestProject::configured()?;
  project.write_file("package.json", "{\"name\":\"acme-workspace\",\"version\":\"99.0.0\"}\n")?;

  let output = run_release_train(&project.path, &["publish"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("not committed"));
  Ok(())
}

#[test]
fn test_publish_requires_next_branch() -> Result<()> {
  let project = TestProject::configured()?;
  git(&project.path, &["checkout", "-q", "-b", "feature-x"])?;

  let output = run_release_train(&project.path, &["publish"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("git checkout main"));
  Ok(())
}

//! Tests for the `hash` command

use crate::helpers::*;
use anyhow::Result;

fn write_package(dir: &std::path::Path, version: &str) -> Result<()> {
  std::fs::create_dir_all(dir.join("lib"))?;
  std::fs::write(
    dir.join("package.json"),
    format!("{{\"name\":\"@acme/core\",\"version\":\"{}\"}}", version),
  )?;
  std::fs::write(dir.join("lib/index.js"), "export const answer = 42;\n")?;
  Ok(())
}

#[test]
fn test_hash_is_deterministic() -> Result<()> {
  let temp = tempfile::TempDir::new()?;
  let a = temp.path().join("a");
  let b = temp.path().join("b");
  write_package(&a, "13.0.0")?;
  write_package(&b, "13.0.0")?;

  let first = stdout(&run_release_train_ok(temp.path(), &["hash", "a"])?);
  let again = stdout(&run_release_train_ok(temp.path(), &["hash", "a"])?);
  let copy = stdout(&run_release_train_ok(temp.path(), &["hash", "b"])?);

  assert_eq!(first.trim().len(), 64);
  assert_eq!(first, again);
  assert_eq!(first, copy);
  Ok(())
}

#[test]
fn test_hash_changes_with_content() -> Result<()> {
  let temp = tempfile::TempDir::new()?;
  let dir = temp.path().join("core");
  write_package(&dir, "13.0.0")?;
  let before = stdout(&run_release_train_ok(temp.path(), &["hash", "core"])?);

  std::fs::write(dir.join("lib/index.js"), "export const answer = 43;\n")?;
  let after = stdout(&run_release_train_ok(temp.path(), &["hash", "core"])?);

  assert_ne!(before, after);
  Ok(())
}

#[test]
fn test_hash_rejects_missing_directory() -> Result<()> {
  let temp = tempfile::TempDir::new()?;
  let output = run_release_train(temp.path(), &["hash", "missing"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("not a directory"));
  Ok(())
}

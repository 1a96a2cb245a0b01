//! Subprocess-backed package manager

use super::{BuiltPackage, NpmPackage, PackageManagerClient, PrecheckPayload, RegistryPackageInfo};
use crate::core::config::PackageManagerConfig;
use crate::core::error::{RailError, RailResult, ResultExt};
use semver::Version;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Runs project scripts through the configured runner and registry commands through npm
pub struct SystemPackageManager {
  root: PathBuf,
  config: PackageManagerConfig,
}

impl SystemPackageManager {
  pub fn new(root: &Path, config: PackageManagerConfig) -> Self {
    Self {
      root: root.to_path_buf(),
      config,
    }
  }

  fn execute(&self, program: &str, args: &[String], stdin: Option<&[u8]>) -> RailResult<Output> {
    let cmdline = format!("{} {}", program, args.join(" "));
    tracing::debug!(command = %cmdline, "package manager");

    let mut child = Command::new(program)
      .current_dir(&self.root)
      .args(args)
      .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .with_context(|| format!("Failed to run `{}`", cmdline))?;

    if let Some(input) = stdin
      && let Some(mut pipe) = child.stdin.take()
    {
      pipe.write_all(input).with_context(|| format!("Failed to write to `{}`", cmdline))?;
    }

    let output = child
      .wait_with_output()
      .with_context(|| format!("Failed to wait for `{}`", cmdline))?;

    if !output.status.success() {
      return Err(RailError::message(format!(
        "`{}` failed:\n{}",
        cmdline,
        String::from_utf8_lossy(&output.stderr).trim()
      )));
    }

    Ok(output)
  }

  fn run_script(&self, script: &str, extra: &[&str], stdin: Option<&[u8]>) -> RailResult<Output> {
    let mut args = vec!["--silent".to_string(), "run".to_string(), script.to_string()];
    args.extend(extra.iter().map(|s| s.to_string()));
    self.execute(&self.config.runner, &args, stdin)
  }

  fn npm(&self, args: &[&str], registry: Option<&str>) -> RailResult<Output> {
    let mut args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    if let Some(registry) = registry {
      args.push("--registry".to_string());
      args.push(registry.to_string());
    }
    self.execute(&self.config.npm, &args, None)
  }
}

/// Parse the JSON document a script printed, ignoring runner banners before it
fn parse_script_json<T: DeserializeOwned>(stdout: &[u8], script: &str) -> RailResult<T> {
  let text = String::from_utf8_lossy(stdout);
  let start = text
    .find(|c| c == '[' || c == '{')
    .ok_or_else(|| RailError::message(format!("Script `{}` did not print JSON output", script)))?;
  serde_json::from_str(text[start..].trim()).with_context(|| format!("Unexpected output of script `{}`", script))
}

impl PackageManagerClient for SystemPackageManager {
  fn install(&self) -> RailResult<()> {
    self.execute(&self.config.runner, &self.config.install_args, None)?;
    Ok(())
  }

  fn build(&self) -> RailResult<Vec<BuiltPackage>> {
    let output = self.run_script(&self.config.build_script, &["--json"], None)?;
    let packages: Vec<BuiltPackage> = parse_script_json(&output.stdout, &self.config.build_script)?;

    // Relative output paths are relative to the project root
    Ok(
      packages
        .into_iter()
        .map(|p| BuiltPackage {
          output_path: self.root.join(&p.output_path),
          name: p.name,
        })
        .collect(),
    )
  }

  fn info(&self) -> RailResult<Vec<NpmPackage>> {
    let output = self.run_script(&self.config.info_script, &["--json"], None)?;
    parse_script_json(&output.stdout, &self.config.info_script)
  }

  fn precheck(&self, payload: &PrecheckPayload<'_>) -> RailResult<()> {
    let Some(script) = &self.config.precheck_script else {
      tracing::debug!("no precheck script configured");
      return Ok(());
    };
    let input = serde_json::to_vec(payload)?;
    self.run_script(script, &[], Some(&input))?;
    Ok(())
  }

  fn publish(&self, package_path: &Path, dist_tag: &str, registry: Option<&str>) -> RailResult<()> {
    let path = package_path.to_string_lossy();
    self.npm(&["publish", &path, "--access", "public", "--tag", dist_tag], registry)?;
    Ok(())
  }

  fn set_dist_tag(&self, package: &str, tag: &str, version: &Version, registry: Option<&str>) -> RailResult<()> {
    let spec = format!("{}@{}", package, version);
    self.npm(&["dist-tag", "add", &spec, tag], registry)?;
    Ok(())
  }

  fn delete_dist_tag(&self, package: &str, tag: &str, registry: Option<&str>) -> RailResult<()> {
    self.npm(&["dist-tag", "rm", package, tag], registry)?;
    Ok(())
  }

  fn registry_info(&self, package: &str, registry: Option<&str>) -> RailResult<RegistryPackageInfo> {
    let output = self.npm(&["view", package, "--json"], registry)?;
    serde_json::from_slice(&output.stdout).with_context(|| format!("Unexpected registry document for {}", package))
  }

  fn whoami(&self, registry: Option<&str>) -> RailResult<Option<String>> {
    match self.npm(&["whoami"], registry) {
      Ok(output) => {
        let user = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if user.is_empty() { None } else { Some(user) })
      }
      Err(e) => {
        tracing::debug!(error = %e, "npm whoami failed");
        Ok(None)
      }
    }
  }
}

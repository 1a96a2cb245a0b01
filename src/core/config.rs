use crate::core::error::{ConfigError, RailError, RailResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for release-train
/// Searched in order: release-train.toml, .release-train.toml, .config/release-train.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RailConfig {
  pub github: GithubConfig,
  pub release: ReleaseConfig,
  #[serde(default)]
  pub package_manager: PackageManagerConfig,
}

/// Upstream repository the release trains live in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
  pub owner: String,
  pub name: String,

  /// Branch carrying the `next` release-train (default: "main")
  #[serde(default = "default_main_branch")]
  pub main_branch: String,

  /// Push and fetch over SSH instead of HTTPS
  #[serde(default)]
  pub use_ssh: bool,
}

fn default_main_branch() -> String {
  "main".to_string()
}

impl GithubConfig {
  /// `owner/name`
  pub fn slug(&self) -> String {
    format!("{}/{}", self.owner, self.name)
  }
}

/// Static release configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
  /// Package whose registry document represents the whole project (dist tags, publish times)
  pub representative_npm_package: String,

  /// Registry to publish to (default: the package manager's configured registry)
  #[serde(default)]
  pub publish_registry: Option<String>,

  /// Labels added to every pull request the release tool creates
  #[serde(default)]
  pub release_pr_labels: Vec<String>,

  /// Changelog file, relative to the project root
  #[serde(default = "default_changelog_path")]
  pub changelog_path: PathBuf,

  /// Root package.json, relative to the project root
  #[serde(default = "default_package_json_path")]
  pub package_json_path: PathBuf,

  /// Seconds to wait between merge attempts while waiting for a pull request
  #[serde(default = "default_merge_poll_interval")]
  pub merge_poll_interval_secs: u64,

  /// GitHub merge method used when merging release pull requests
  #[serde(default = "default_merge_method")]
  pub merge_method: String,
}

fn default_changelog_path() -> PathBuf {
  PathBuf::from("CHANGELOG.md")
}

fn default_package_json_path() -> PathBuf {
  PathBuf::from("package.json")
}

fn default_merge_poll_interval() -> u64 {
  5
}

fn default_merge_method() -> String {
  "rebase".to_string()
}

/// How the project's package manager and release scripts are invoked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageManagerConfig {
  /// Runner binary for project scripts (e.g. "pnpm", "yarn", "npm")
  #[serde(default = "default_runner")]
  pub runner: String,

  /// Arguments for installing dependencies
  #[serde(default = "default_install_args")]
  pub install_args: Vec<String>,

  /// Script printing `[{"name", "outputPath"}]` after building release output
  #[serde(default = "default_build_script")]
  pub build_script: String,

  /// Script printing `[{"name", "experimental"}]` for every release package
  #[serde(default = "default_info_script")]
  pub info_script: String,

  /// Script validating release output; receives a JSON payload on stdin
  #[serde(default)]
  pub precheck_script: Option<String>,

  /// npm binary used for registry operations
  #[serde(default = "default_npm")]
  pub npm: String,
}

fn default_runner() -> String {
  "pnpm".to_string()
}

fn default_install_args() -> Vec<String> {
  vec!["install".to_string(), "--frozen-lockfile".to_string()]
}

fn default_build_script() -> String {
  "release:build".to_string()
}

fn default_info_script() -> String {
  "release:info".to_string()
}

fn default_npm() -> String {
  "npm".to_string()
}

impl Default for PackageManagerConfig {
  fn default() -> Self {
    Self {
      runner: default_runner(),
      install_args: default_install_args(),
      build_script: default_build_script(),
      info_script: default_info_script(),
      precheck_script: None,
      npm: default_npm(),
    }
  }
}

const MERGE_METHODS: [&str; 3] = ["merge", "squash", "rebase"];

impl RailConfig {
  /// Find config file in search order: release-train.toml, .release-train.toml, .config/release-train.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("release-train.toml"),
      path.join(".release-train.toml"),
      path.join(".config").join("release-train.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config (searches multiple locations)
  pub fn load(path: &Path) -> RailResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      RailError::Config(ConfigError::NotFound {
        workspace_root: path.to_path_buf(),
      })
    })?;

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

    Self::parse(&content).with_context(|| format!("Invalid configuration in {}", config_path.display()))
  }

  /// Parse and validate config contents
  pub fn parse(content: &str) -> RailResult<Self> {
    let config: RailConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Validate configuration
  pub fn validate(&self) -> RailResult<()> {
    if self.github.owner.trim().is_empty() {
      return Err(RailError::Config(ConfigError::MissingField {
        field: "github.owner".to_string(),
      }));
    }
    if self.github.name.trim().is_empty() {
      return Err(RailError::Config(ConfigError::MissingField {
        field: "github.name".to_string(),
      }));
    }
    if self.release.representative_npm_package.trim().is_empty() {
      return Err(RailError::Config(ConfigError::MissingField {
        field: "release.representative_npm_package".to_string(),
      }));
    }
    if !MERGE_METHODS.contains(&self.release.merge_method.as_str()) {
      return Err(RailError::Config(ConfigError::InvalidField {
        field: "release.merge_method".to_string(),
        reason: format!(
          "'{}' is not one of {}",
          self.release.merge_method,
          MERGE_METHODS.join(", ")
        ),
      }));
    }
    if self.package_manager.runner.trim().is_empty() {
      return Err(RailError::Config(ConfigError::MissingField {
        field: "package_manager.runner".to_string(),
      }));
    }
    Ok(())
  }
}

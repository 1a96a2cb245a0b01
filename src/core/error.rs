//! Error types for release-train with contextual messages and exit codes
//!
//! Two kinds matter to the release flow: [`RailError::Fatal`] aborts the run
//! after printing an explanation, and [`RailError::UserAborted`] is the graceful
//! exit taken when a caretaker declines a confirmation. Everything else
//! (config, git, code host, I/O) is categorized so the CLI can pick an exit
//! code and a help message.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for release-train
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, network, I/O)
  System = 2,
  /// Fatal release error (integrity, lineage, unexpected branch state)
  Fatal = 3,
  /// The caretaker aborted the release
  Aborted = 4,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for release-train
#[derive(Debug)]
pub enum RailError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Code host (GitHub) API errors
  CodeHost(ApiError),

  /// Unrecoverable release error; the message has already been explained
  Fatal { message: String, help: Option<String> },

  /// A confirmation was declined
  UserAborted,

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl RailError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    RailError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    RailError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Create a fatal release error
  pub fn fatal(msg: impl Into<String>) -> Self {
    RailError::Fatal {
      message: msg.into(),
      help: None,
    }
  }

  /// Create a fatal release error with help text
  pub fn fatal_with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    RailError::Fatal {
      message: msg.into(),
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      RailError::Message { message, context, help } => RailError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      RailError::Io(e) => RailError::Message {
        message: format!("{}: {}", ctx_str, e),
        context: None,
        help: None,
      },
      _ => self,
    }
  }

  /// Whether the run ended because a confirmation was declined
  pub fn is_user_aborted(&self) -> bool {
    matches!(self, RailError::UserAborted)
  }

  /// Whether this is a fatal release error
  pub fn is_fatal(&self) -> bool {
    matches!(self, RailError::Fatal { .. })
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      RailError::Config(_) => ExitCode::User,
      RailError::Git(_) => ExitCode::System,
      RailError::CodeHost(_) => ExitCode::System,
      RailError::Fatal { .. } => ExitCode::Fatal,
      RailError::UserAborted => ExitCode::Aborted,
      RailError::Io(_) => ExitCode::System,
      RailError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      RailError::Config(e) => e.help_message(),
      RailError::Git(e) => e.help_message(),
      RailError::CodeHost(e) => e.help_message(),
      RailError::Fatal { help, .. } => help.clone(),
      RailError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for RailError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RailError::Config(e) => write!(f, "{}", e),
      RailError::Git(e) => write!(f, "{}", e),
      RailError::CodeHost(e) => write!(f, "{}", e),
      RailError::Fatal { message, .. } => write!(f, "{}", message),
      RailError::UserAborted => write!(f, "Release action has been aborted"),
      RailError::Io(e) => write!(f, "I/O error: {}", e),
      RailError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for RailError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      RailError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for RailError {
  fn from(err: io::Error) -> Self {
    RailError::Io(err)
  }
}

impl From<ApiError> for RailError {
  fn from(err: ApiError) -> Self {
    RailError::CodeHost(err)
  }
}

impl From<String> for RailError {
  fn from(msg: String) -> Self {
    RailError::message(msg)
  }
}

impl From<&str> for RailError {
  fn from(msg: &str) -> Self {
    RailError::message(msg)
  }
}

impl From<toml_edit::de::Error> for RailError {
  fn from(err: toml_edit::de::Error) -> Self {
    RailError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for RailError {
  fn from(err: serde_json::Error) -> Self {
    RailError::message(format!("JSON error: {}", err))
  }
}

impl From<semver::Error> for RailError {
  fn from(err: semver::Error) -> Self {
    RailError::message(format!("Invalid version: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for RailError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    RailError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<walkdir::Error> for RailError {
  fn from(err: walkdir::Error) -> Self {
    RailError::message(format!("Failed to walk directory: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// release-train.toml not found
  NotFound { workspace_root: PathBuf },

  /// Missing required field
  MissingField { field: String },

  /// Field present but unusable
  InvalidField { field: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => Some(
        "Create release-train.toml with [github] owner/name and [release] representative_npm_package.".to_string(),
      ),
      ConfigError::MissingField { field } => Some(format!("Add `{}` to release-train.toml.", field)),
      ConfigError::InvalidField { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { workspace_root } => {
        write!(
          f,
          "No release-train configuration found.\nExpected file: {}/release-train.toml",
          workspace_root.display()
        )
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::InvalidField { field, reason } => {
        write!(f, "Invalid value for `{}`: {}", field, reason)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Push failed
  PushFailed {
    remote: String,
    branch: String,
    reason: String,
  },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") {
          Some("The remote has commits you don't have. Delete the stale fork branch and re-run.".to_string())
        } else if reason.contains("permission denied") || reason.contains("403") {
          Some("Check your git credentials for the fork. `gh auth setup-git` configures them.".to_string())
        } else {
          None
        }
      }
      GitError::RepoNotFound { path } => Some(format!(
        "Run release-train from a clone of the project: {}",
        path.display()
      )),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::PushFailed { remote, branch, reason } => {
        write!(f, "Push to {}/{} failed: {}", remote, branch, reason)
      }
    }
  }
}

/// Error returned by the code host, carrying the HTTP status when known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
  /// HTTP status code (0 when the request never produced a response)
  pub status: u16,
  pub message: String,
}

impl ApiError {
  pub fn new(status: u16, message: impl Into<String>) -> Self {
    Self {
      status,
      message: message.into(),
    }
  }

  /// Bad credentials or expired token
  pub fn is_unauthorized(&self) -> bool {
    self.status == 401
  }

  /// Request rejected by the code host (4xx)
  pub fn is_client_error(&self) -> bool {
    (400..500).contains(&self.status)
  }

  pub fn is_not_found(&self) -> bool {
    self.status == 404
  }

  fn help_message(&self) -> Option<String> {
    if self.is_unauthorized() {
      Some(
        "Your GitHub token is invalid or expired. Run `gh auth login` (or export GITHUB_TOKEN) with `repo` scope."
          .to_string(),
      )
    } else {
      None
    }
  }
}

impl fmt::Display for ApiError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.status == 0 {
      write!(f, "GitHub API request failed: {}", self.message)
    } else {
      write!(f, "GitHub API request failed (HTTP {}): {}", self.status, self.message)
    }
  }
}

impl std::error::Error for ApiError {}

/// Result type alias for release-train
pub type RailResult<T> = Result<T, RailError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> RailResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> RailResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<RailError>,
{
  fn context(self, ctx: impl Into<String>) -> RailResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> RailResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Convert a code-host error at its point of use.
///
/// Bad credentials always end the run with token guidance; every other status
/// is handed back unchanged so the call site can decide.
pub fn check_unauthorized(err: ApiError) -> RailError {
  if err.is_unauthorized() {
    RailError::fatal_with_help(
      format!("GitHub rejected the request as unauthorized: {}", err.message),
      "Run `gh auth login` (or export GITHUB_TOKEN) with `repo` scope and retry.",
    )
  } else {
    RailError::CodeHost(err)
  }
}

/// Pretty-print an error to stderr with colors and help text
pub fn print_error(error: &RailError) {
  if error.is_user_aborted() {
    eprintln!("\n⏹️  {}\n", error);
    return;
  }

  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exit_codes() {
    assert_eq!(RailError::fatal("x").exit_code(), ExitCode::Fatal);
    assert_eq!(RailError::UserAborted.exit_code(), ExitCode::Aborted);
    assert_eq!(RailError::CodeHost(ApiError::new(500, "boom")).exit_code(), ExitCode::System);
    assert_eq!(RailError::message("x").exit_code().as_i32(), 1);
  }

  #[test]
  fn test_unauthorized_becomes_fatal_with_guidance() {
    let err = check_unauthorized(ApiError::new(401, "Bad credentials"));
    assert!(err.is_fatal());
    assert!(err.help_message().unwrap().contains("gh auth login"));

    let err = check_unauthorized(ApiError::new(422, "Validation Failed"));
    assert!(matches!(err, RailError::CodeHost(ApiError { status: 422, .. })));
  }

  #[test]
  fn test_context_chains_messages() {
    let err = RailError::message("inner").context("outer");
    assert_eq!(err.to_string(), "inner\nouter");
  }

  #[test]
  fn test_api_error_classification() {
    assert!(ApiError::new(404, "Not Found").is_client_error());
    assert!(ApiError::new(404, "Not Found").is_not_found());
    assert!(!ApiError::new(502, "Bad Gateway").is_client_error());
  }
}

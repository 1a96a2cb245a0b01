//! Core engine for release-train operations
//!
//! - **config**: release-train.toml parsing and validation
//! - **context**: Release context shared by all actions
//! - **error**: Error types with contextual help messages and exit codes
//! - **prompt**: Confirmation and selection prompts
//! - **vcs**: Git operations abstraction (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod prompt;
pub mod vcs;

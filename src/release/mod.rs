//! Staged release and publishing
//!
//! - **actions**: the release actions offered to the caretaker
//! - **pipeline**: staging, merge gate, verified publish and changelog propagation
//! - **integrity**: content hashes and version checks of build output
//! - **notes**: release notes and changelog entries from conventional commits
//! - **pull_request**: merge-wait loop for release pull requests
//! - **dist_tags**: registry dist-tag updates across all release packages
//! - **commit_message**: commit message formats recognized by the lineage checks

pub mod actions;
pub mod commit_message;
pub mod dist_tags;
pub mod integrity;
pub mod notes;
pub mod pipeline;
pub mod pull_request;

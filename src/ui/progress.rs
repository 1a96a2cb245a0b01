//! Progress indicators for per-package registry operations
//!
//! Uses `linya` for allocation-free progress bars

use linya::{Bar, Progress};

/// Progress bar over the release packages
pub struct PackageProgress {
  progress: Progress,
  bar: Bar,
}

impl PackageProgress {
  /// Create a new progress bar for `total` packages
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self { progress, bar }
  }

  /// Increment progress by 1
  pub fn inc(&mut self) {
    self.progress.inc_and_draw(&self.bar, 1);
  }
}

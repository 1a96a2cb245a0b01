//! Release notes built from conventional commits

use crate::core::error::{RailResult, ResultExt};
use crate::core::vcs::VersionControlClient;
use crate::github::RepoRef;
use chrono::NaiveDate;
use regex::Regex;
use semver::Version;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::OnceLock;

/// Conventional commit type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitType {
  Feat,
  Fix,
  Perf,
  Docs,
  Refactor,
  Build,
  Release,
  Other,
}

impl CommitType {
  fn parse(raw: &str) -> Self {
    match raw.to_ascii_lowercase().as_str() {
      "feat" => CommitType::Feat,
      "fix" => CommitType::Fix,
      "perf" => CommitType::Perf,
      "docs" => CommitType::Docs,
      "refactor" => CommitType::Refactor,
      "build" | "ci" => CommitType::Build,
      "release" => CommitType::Release,
      _ => CommitType::Other,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteCommit {
  pub sha: String,
  pub commit_type: CommitType,
  pub scope: Option<String>,
  pub subject: String,
  pub breaking: bool,
}

impl NoteCommit {
  /// Parse a `<sha>|||<subject>` log line
  fn from_log_line(line: &str) -> Option<Self> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
      Regex::new(r"^(?P<type>\w+)(?:\((?P<scope>[^)]*)\))?(?P<breaking>!)?:\s*(?P<subject>.+)$")
        .expect("valid conventional commit regex")
    });

    let (sha, message) = line.split_once("|||")?;
    let sha = sha.trim().to_string();
    let message = message.trim();

    Some(match re.captures(message) {
      Some(caps) => NoteCommit {
        sha,
        commit_type: CommitType::parse(&caps["type"]),
        scope: caps.name("scope").map(|m| m.as_str().to_string()).filter(|s| !s.is_empty()),
        subject: caps["subject"].to_string(),
        breaking: caps.name("breaking").is_some(),
      },
      None => NoteCommit {
        sha,
        commit_type: CommitType::Other,
        scope: None,
        subject: message.to_string(),
        breaking: false,
      },
    })
  }
}

/// Release notes for a single version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseNotes {
  pub version: Version,
  pub date: NaiveDate,
  pub repo: RepoRef,
  pub commits: Vec<NoteCommit>,
}

impl ReleaseNotes {
  /// Collect the commits in `<base>..HEAD`
  pub fn for_range(
    git: &dyn VersionControlClient,
    repo: RepoRef,
    version: Version,
    base: &str,
    date: NaiveDate,
  ) -> RailResult<Self> {
    let range = format!("{}..HEAD", base);
    let output = git
      .run(&["log", "--no-merges", "--pretty=format:%H|||%s", &range])
      .with_context(|| format!("Unable to collect commits for v{}", version))?;

    Ok(Self {
      version,
      date,
      repo,
      commits: output.lines().iter().filter_map(|l| NoteCommit::from_log_line(l)).collect(),
    })
  }

  fn commit_link(&self, sha: &str) -> String {
    let short = &sha[..sha.len().min(7)];
    format!(
      "[{}](https://github.com/{}/{}/commit/{})",
      short, self.repo.owner, self.repo.name, sha
    )
  }

  fn render_sections(&self, out: &mut String) {
    let sections: [(&str, fn(&NoteCommit) -> bool); 4] = [
      ("Breaking Changes", |c| c.breaking),
      ("Features", |c| c.commit_type == CommitType::Feat),
      ("Bug Fixes", |c| c.commit_type == CommitType::Fix),
      ("Performance Improvements", |c| c.commit_type == CommitType::Perf),
    ];

    let mut any = false;
    for (title, include) in sections {
      let commits: Vec<&NoteCommit> = self.commits.iter().filter(|c| include(c)).collect();
      if commits.is_empty() {
        continue;
      }
      any = true;
      out.push_str(&format!("### {}\n", title));
      for commit in commits {
        let scope = commit.scope.as_ref().map(|s| format!("**{}:** ", s)).unwrap_or_default();
        out.push_str(&format!("- {}{} ({})\n", scope, commit.subject, self.commit_link(&commit.sha)));
      }
      out.push('\n');
    }

    if !any {
      out.push_str("No user facing changes in this release.\n\n");
    }
  }

  /// Markdown entry prepended to the changelog
  pub fn changelog_entry(&self) -> String {
    let mut out = format!(
      "<a name=\"{}\"></a>\n# {} ({})\n",
      self.version,
      self.version,
      self.date.format("%Y-%m-%d")
    );
    self.render_sections(&mut out);
    out
  }

  /// Body of the GitHub release
  pub fn github_release_body(&self) -> String {
    let mut out = String::new();
    self.render_sections(&mut out);
    out.trim_end().to_string()
  }

  /// Link to this version's entry in the changelog on `branch`
  pub fn changelog_url(&self, branch: &str, changelog_path: &Path) -> String {
    format!(
      "https://github.com/{}/{}/blob/{}/{}#{}",
      self.repo.owner,
      self.repo.name,
      branch,
      changelog_path.to_string_lossy().replace('\\', "/"),
      self.version
    )
  }

  /// Prepend the changelog entry to the changelog file (created when missing)
  pub fn prepend_to_changelog(&self, path: &Path) -> RailResult<()> {
    let existing = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
      Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    let content = format!("{}\n{}", self.changelog_entry(), existing);
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
  }
}

pub mod system_git;
mod system_git_ops;

pub use system_git::SystemGit;

use crate::core::error::ReleaseResult;
use std::path::Path;

/// Result of `commit_and_push`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
  /// Changes were committed (sha) and pushed
  Pushed { sha: String },
  /// Nothing new locally, but earlier commits were pushed
  PushedExisting,
  /// Work tree clean and branch already on the remote
  NothingToCommit,
}

/// Branch/commit/push operations the release workflows need
///
/// Every call blocks until the underlying command finishes.
pub trait Vcs {
  /// Root of the work tree
  fn work_tree(&self) -> &Path;

  /// Currently checked-out branch (`HEAD` when detached)
  fn current_branch(&self) -> ReleaseResult<String>;

  /// Check out `name`, pulling afterwards unless `skip_pull`
  fn switch_branch(&self, name: &str, skip_pull: bool) -> ReleaseResult<()>;

  /// Branch off the development line, or check out an existing branch
  fn create_release_branch(&self, name: &str) -> ReleaseResult<()>;

  /// Delete a branch locally when present and (best effort) on the remote
  fn delete_branch(&self, name: &str) -> ReleaseResult<()>;

  /// Commit all pending changes and push with upstream tracking
  fn commit_and_push(&self, branch: &str, message: &str) -> ReleaseResult<CommitOutcome>;

  /// Does a local branch with this name exist
  fn branch_exists(&self, name: &str) -> ReleaseResult<bool>;

  /// Does the remote itself (not the local tracking ref) have this branch
  fn remote_branch_exists(&self, name: &str) -> ReleaseResult<bool>;

  /// Bring the remote-tracking ref of `branch` up to date
  fn fetch(&self, branch: &str) -> ReleaseResult<()>;

  /// Stash pending changes, untracked files included; `false` when clean
  fn stash_changes(&self, message: &str) -> ReleaseResult<bool>;

  /// URL of the configured remote
  fn remote_url(&self) -> ReleaseResult<Option<String>>;

  /// File contents at a ref, `None` when the ref or file is missing
  fn read_file_at_ref(&self, reference: &str, path: &Path) -> ReleaseResult<Option<String>>;
}

//! Branch, commit and push operations for SystemGit

use super::system_git::SystemGit;
use super::{CommitOutcome, Vcs};
use crate::core::error::{GitError, ReleaseError, ReleaseResult};
use std::path::Path;

impl SystemGit {
  /// Fold development/stable names to lowercase so `Dev` and `dev` don't
  /// end up as two branches
  pub(crate) fn normalize_branch(&self, name: &str) -> String {
    if name.eq_ignore_ascii_case(&self.branches.development) || name.eq_ignore_ascii_case(&self.branches.stable) {
      name.to_lowercase()
    } else {
      name.to_string()
    }
  }

  fn tracking_branch_exists(&self, name: &str) -> ReleaseResult<bool> {
    let reference = format!("refs/remotes/{}/{}", self.branches.remote, name);
    self.probe(&["rev-parse", "--verify", "--quiet", &reference])
  }

  fn pull(&self, name: &str) -> ReleaseResult<()> {
    tracing::debug!(branch = name, remote = %self.branches.remote, "pulling");
    self.run(&["pull", "--ff-only", &self.branches.remote, name])?;
    Ok(())
  }

  /// Paths with staged, unstaged or untracked changes
  pub(crate) fn pending_changes(&self) -> ReleaseResult<Vec<String>> {
    let output = self.run(&["status", "--porcelain=v1", "--untracked-files=all"])?;
    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| line.len() > 3)
        .map(|line| line[3..].to_string())
        .collect(),
    )
  }

  /// Commits on `branch` that its remote counterpart lacks
  ///
  /// A branch that doesn't exist on the remote yet counts as ahead.
  pub(crate) fn unpushed_commits(&self, branch: &str) -> ReleaseResult<usize> {
    if !self.tracking_branch_exists(branch)? {
      return Ok(usize::MAX);
    }
    let range = format!("{}/{}..{}", self.branches.remote, branch, branch);
    let count = self.run_stdout(&["rev-list", "--count", &range])?;
    Ok(count.parse()?)
  }

  fn push(&self, branch: &str) -> ReleaseResult<()> {
    tracing::info!(branch, remote = %self.branches.remote, "pushing");

    let output = self
      .git_cmd()
      .args(["push", "-u", &self.branches.remote, branch])
      .output()?;

    if !output.status.success() {
      return Err(ReleaseError::Git(GitError::PushFailed {
        remote: self.branches.remote.clone(),
        branch: branch.to_string(),
        reason: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(())
  }
}

impl Vcs for SystemGit {
  fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  fn current_branch(&self) -> ReleaseResult<String> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--abbrev-ref", "HEAD"])
      .output()?;

    if !output.status.success() {
      return Ok("HEAD".to_string()); // Unborn or detached HEAD
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  fn switch_branch(&self, name: &str, skip_pull: bool) -> ReleaseResult<()> {
    let target = self.normalize_branch(name);
    let current = self.current_branch()?;

    if current == target {
      tracing::debug!(branch = %target, "already on branch");
      return Ok(());
    }

    if !self.branch_exists(&target)? && !self.tracking_branch_exists(&target)? {
      return Err(ReleaseError::BranchNotFound { name: target });
    }

    tracing::info!(from = %current, to = %target, "switching branch");
    self.run(&["checkout", &target])?;

    if !skip_pull {
      self.pull(&target)?;
    }

    Ok(())
  }

  fn create_release_branch(&self, name: &str) -> ReleaseResult<()> {
    let development = self.branches.development.clone();
    self.switch_branch(&development, false)?;

    if self.branch_exists(name)? {
      tracing::info!(branch = name, "release branch exists, reusing it");
      self.run(&["checkout", name])?;
    } else {
      tracing::info!(branch = name, base = %development, "creating release branch");
      self.run(&["checkout", "-b", name])?;
    }

    Ok(())
  }

  fn delete_branch(&self, name: &str) -> ReleaseResult<()> {
    let target = self.normalize_branch(name);
    if target == self.branches.development || target == self.branches.stable {
      return Err(ReleaseError::Git(GitError::BranchError {
        message: format!("refusing to delete long-lived branch '{}'", target),
      }));
    }

    let development = self.branches.development.clone();
    self.switch_branch(&development, true)?;

    if self.branch_exists(&target)? {
      tracing::info!(branch = %target, "deleting branch");
      self.run(&["branch", "-D", &target])?;
    } else {
      tracing::debug!(branch = %target, "no local branch to delete");
    }

    // Remote cleanup is best effort; the local delete stands either way
    if let Err(e) = self.run(&["push", &self.branches.remote, "--delete", &target]) {
      tracing::warn!(branch = %target, error = %e, "remote branch delete failed");
    }
    if let Err(e) = self.run(&["remote", "prune", &self.branches.remote]) {
      tracing::warn!(remote = %self.branches.remote, error = %e, "remote prune failed");
    }

    Ok(())
  }

  fn commit_and_push(&self, branch: &str, message: &str) -> ReleaseResult<CommitOutcome> {
    let pending = self.pending_changes()?;

    if pending.is_empty() {
      if self.unpushed_commits(branch)? == 0 {
        tracing::info!(branch, "nothing to commit");
        return Ok(CommitOutcome::NothingToCommit);
      }
      self.push(branch)?;
      return Ok(CommitOutcome::PushedExisting);
    }

    tracing::info!(branch, files = pending.len(), "committing");
    self.run(&["add", "--all"])?;
    self.run(&["commit", "--quiet", "-m", message])?;
    let sha = self.run_stdout(&["rev-parse", "HEAD"])?;

    self.push(branch)?;
    Ok(CommitOutcome::Pushed { sha })
  }

  fn branch_exists(&self, name: &str) -> ReleaseResult<bool> {
    let reference = format!("refs/heads/{}", name);
    self.probe(&["rev-parse", "--verify", "--quiet", &reference])
  }

  fn remote_branch_exists(&self, name: &str) -> ReleaseResult<bool> {
    let reference = format!("refs/heads/{}", name);
    let output = self
      .git_cmd()
      .args(["ls-remote", "--exit-code", "--heads", &self.branches.remote, &reference])
      .output()?;

    // --exit-code: 2 means the remote answered without a matching ref
    match output.status.code() {
      Some(0) => Ok(true),
      Some(2) => Ok(false),
      _ => Err(ReleaseError::Git(GitError::CommandFailed {
        command: format!("git ls-remote --heads {} {}", self.branches.remote, reference),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      })),
    }
  }

  fn fetch(&self, branch: &str) -> ReleaseResult<()> {
    tracing::debug!(branch, remote = %self.branches.remote, "fetching");
    let refspec = format!(
      "+refs/heads/{branch}:refs/remotes/{remote}/{branch}",
      remote = self.branches.remote
    );
    self.run(&["fetch", "--quiet", &self.branches.remote, &refspec])?;
    Ok(())
  }

  fn stash_changes(&self, message: &str) -> ReleaseResult<bool> {
    if self.pending_changes()?.is_empty() {
      return Ok(false);
    }
    tracing::info!(message, "stashing uncommitted changes");
    self.run(&["stash", "push", "--include-untracked", "--quiet", "-m", message])?;
    Ok(true)
  }

  /// Configured URL of the remote, without `insteadOf` rewriting
  fn remote_url(&self) -> ReleaseResult<Option<String>> {
    let key = format!("remote.{}.url", self.branches.remote);
    let output = self.git_cmd().args(["config", "--get", &key]).output()?;

    if !output.status.success() {
      return Ok(None);
    }

    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(if url.is_empty() { None } else { Some(url) })
  }

  fn read_file_at_ref(&self, reference: &str, path: &Path) -> ReleaseResult<Option<String>> {
    let spec = format!("{}:{}", reference, path.to_string_lossy().replace('\\', "/"));

    let output = self.git_cmd().args(["show", &spec]).output()?;

    if !output.status.success() {
      return Ok(None);
    }

    Ok(Some(String::from_utf8(output.stdout)?))
  }
}

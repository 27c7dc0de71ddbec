//! System git backend
//!
//! Every operation is one blocking `git` subprocess with an isolated
//! environment. Output is read through porcelain/plumbing formats rather than
//! human-readable messages.

use crate::core::config::BranchConfig;
use crate::core::error::{ContextError, GitError, ReleaseError, ReleaseResult, ResultExt};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Environment variables passed through to git
const PASSTHROUGH_ENV: &[&str] = &[
  "PATH",
  "HOME",
  "USERPROFILE",
  "SSH_AUTH_SOCK",
  "GIT_SSH_COMMAND",
  "GIT_ASKPASS",
  "SYSTEMROOT",
];

/// Git backend using system git
pub struct SystemGit {
  /// Working tree root
  pub(crate) work_tree: PathBuf,

  /// Development/stable/remote names
  pub(crate) branches: BranchConfig,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// Fails with `ToolMissing` when git cannot be spawned at all.
  pub fn open(path: &Path, branches: BranchConfig) -> ReleaseResult<Self> {
    let output = match Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
    {
      Ok(output) => output,
      Err(e) if e.kind() == ErrorKind::NotFound => {
        return Err(ReleaseError::Context(ContextError::ToolMissing));
      }
      Err(e) => return Err(ReleaseError::from(e).context("Failed to execute git rev-parse")),
    };

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") || stderr.contains("cannot change to") {
        return Err(ReleaseError::Context(ContextError::NotARepository {
          path: path.to_path_buf(),
        }));
      }
      return Err(ReleaseError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      work_tree: PathBuf::from(work_tree),
      branches,
    })
  }

  /// Branch names this repository was opened with
  pub fn branches(&self) -> &BranchConfig {
    &self.branches
  }

  /// Run git with `args`, failing on a non-zero exit
  pub(crate) fn run(&self, args: &[&str]) -> ReleaseResult<Output> {
    let output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
      return Err(ReleaseError::Git(GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(output)
  }

  /// Run git and return trimmed stdout
  pub(crate) fn run_stdout(&self, args: &[&str]) -> ReleaseResult<String> {
    let output = self.run(args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Run git and only report whether it succeeded
  pub(crate) fn probe(&self, args: &[&str]) -> ReleaseResult<bool> {
    let status = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to run git {}", args.join(" ")))?
      .status;
    Ok(status.success())
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to the work tree
  /// - Clears environment variables, passing through only what auth needs
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.work_tree);

    cmd.env_clear();
    for key in PASSTHROUGH_ENV {
      if let Ok(value) = std::env::var(key) {
        cmd.env(key, value);
      }
    }
    // Never block on an interactive prompt
    cmd.env("GIT_TERMINAL_PROMPT", "0");

    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");

    cmd
  }
}

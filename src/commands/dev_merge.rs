//! `stig-release dev-merge start|complete`

use super::{GlobalOptions, Workspace, print_outcome};
use crate::core::config::CompletionErrorPolicy;
use crate::core::error::ReleaseResult;
use crate::core::version::ModuleVersion;
use crate::github::ThreadSleeper;
use crate::release::{BranchKind, Orchestrator};

/// Cut the branch for `version`, stamp artifacts and open the pull request
pub fn run_dev_merge_start(options: &GlobalOptions, kind: BranchKind, version: &str) -> ReleaseResult<()> {
  let version: ModuleVersion = version.parse()?;
  let workspace = Workspace::open(options)?;

  let orchestrator = Orchestrator::new(&workspace.config, &workspace.git, &workspace.connector, &ThreadSleeper);
  let outcome = orchestrator.dev_merge_start(kind, version)?;

  print_outcome(&outcome, options.json)
}

/// Merge the dev-merge pull request `number`
pub fn run_dev_merge_complete(options: &GlobalOptions, number: u64, suppress_api_errors: bool) -> ReleaseResult<()> {
  let mut workspace = Workspace::open(options)?;
  if suppress_api_errors {
    workspace.config.release.completion_errors = CompletionErrorPolicy::Suppress;
  }

  let orchestrator = Orchestrator::new(&workspace.config, &workspace.git, &workspace.connector, &ThreadSleeper);
  let outcome = orchestrator.dev_merge_complete(number)?;

  print_outcome(&outcome, options.json)
}

//! `stig-release release start|complete`

use super::{GlobalOptions, Workspace, print_outcome};
use crate::core::error::ReleaseResult;
use crate::github::{PollPolicy, ThreadSleeper};
use crate::release::Orchestrator;
use crate::ui::progress::PollProgress;

/// Open the development → stable pull request once CI is green
pub fn run_release_start(options: &GlobalOptions, wait: bool) -> ReleaseResult<()> {
  let workspace = Workspace::open(options)?;

  let policy = PollPolicy::from(&workspace.config.polling);
  let sleeper = PollProgress::new(ThreadSleeper, &policy, "Waiting for CI");
  let orchestrator = Orchestrator::new(&workspace.config, &workspace.git, &workspace.connector, &sleeper);
  let outcome = orchestrator.release_start(wait)?;

  print_outcome(&outcome, options.json)
}

/// Merge the release pull request and publish the tagged release
pub fn run_release_complete(options: &GlobalOptions, number: u64) -> ReleaseResult<()> {
  let workspace = Workspace::open(options)?;

  let orchestrator = Orchestrator::new(&workspace.config, &workspace.git, &workspace.connector, &ThreadSleeper);
  let outcome = orchestrator.release_complete(number)?;

  print_outcome(&outcome, options.json)
}

//! `stig-release status`

use super::{GlobalOptions, Workspace};
use crate::core::error::ReleaseResult;
use crate::github::{PollPolicy, RefState, ThreadSleeper};
use crate::release::Orchestrator;
use crate::ui::progress::PollProgress;

/// Show the project, both version lines and CI state of the development line
pub fn run_status(options: &GlobalOptions, wait: bool) -> ReleaseResult<()> {
  let workspace = Workspace::open(options)?;

  let policy = PollPolicy::from(&workspace.config.polling);
  let sleeper = PollProgress::new(ThreadSleeper, &policy, "Waiting for CI");
  let orchestrator = Orchestrator::new(&workspace.config, &workspace.git, &workspace.connector, &sleeper);
  let report = orchestrator.status(wait)?;

  if options.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  let state_icon = match report.development_state {
    RefState::Success => "✅",
    RefState::Failure => "❌",
    RefState::Pending => "⏳",
  };

  println!("📦 {} ({})", report.project.name, report.project.web_url);
  println!("   On branch:   {}", report.current_branch);
  println!("   Published:   {}", report.published_version);
  println!(
    "   Development: {} {} {}",
    report.development_version, state_icon, report.development_state
  );
  if report.development_version <= report.published_version {
    println!("   ⚠️  Development version is not ahead of the published version");
  }
  Ok(())
}

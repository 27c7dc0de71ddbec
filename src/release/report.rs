//! Read-only view of where a release stands

use super::Orchestrator;
use crate::core::context::RepositoryContext;
use crate::core::error::ReleaseResult;
use crate::core::version::ModuleVersion;
use crate::github::{RefState, get_ref_status};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
  pub project: RepositoryContext,
  pub current_branch: String,
  pub published_version: ModuleVersion,
  pub development_version: ModuleVersion,
  pub development_state: RefState,
}

impl Orchestrator<'_> {
  /// Project, versions on both lines and CI state of the development line
  pub fn status(&self, wait: bool) -> ReleaseResult<StatusReport> {
    let project = self.resolve_context()?;
    let host = self.connector.connect(&project)?;

    let development_state = get_ref_status(
      host.as_ref(),
      &project,
      &self.config.branches.development,
      wait,
      &self.poll_policy(),
      self.sleeper,
    )?;
    let (development_version, _) = self.development_release()?;

    Ok(StatusReport {
      current_branch: self.vcs.current_branch()?,
      published_version: self.published_version()?,
      development_version,
      development_state,
      project,
    })
  }
}

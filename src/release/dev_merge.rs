//! Dev-Merge workflow: feature/hotfix branch into the development line

use super::{BranchGuard, BranchKind, Orchestrator, Outcome, ReleaseBranch};
use crate::artifacts::ReleaseNotes;
use crate::core::config::CompletionErrorPolicy;
use crate::core::context::RepositoryContext;
use crate::core::error::ReleaseResult;
use crate::core::version::{ModuleVersion, validate_version};
use crate::github::{self, CodeHost, NewPullRequest};

impl Orchestrator<'_> {
  /// Cut (or reuse) the branch for `version`, stamp the artifacts, push and
  /// open a pull request into the development line
  pub fn dev_merge_start(&self, kind: BranchKind, version: ModuleVersion) -> ReleaseResult<Outcome> {
    let ctx = self.resolve_context()?;
    let host = self.connector.connect(&ctx)?;
    let branch = ReleaseBranch::new(kind, &version, &self.config.branches);
    tracing::info!(%version, %kind, branch = %branch.name, "starting dev merge");

    validate_version(version, self.published_version()?)?;

    let guard = BranchGuard::new(self.vcs)?;
    self.vcs.create_release_branch(&branch.name)?;

    let notes = self
      .artifacts()
      .release_notes(&version, self.config.release.include_release_notes)?;
    if let Err(e) = self.stamp_artifacts(host.as_ref(), &ctx, version, &notes) {
      self.shelve_partial_edits(&branch.name);
      return Err(e);
    }

    let outcome = self.vcs.commit_and_push(&branch.name, &format!("Release {}", version))?;
    tracing::debug!(?outcome, "commit finished");

    let development = &self.config.branches.development;
    let pr = match github::find_pull_request(host.as_ref(), &ctx, &branch.name, development)? {
      Some(pr) => {
        tracing::info!(number = pr.number, "reusing open pull request");
        pr
      }
      None => host.create_pull_request(
        &ctx,
        &NewPullRequest {
          title: version.to_string(),
          head: branch.name.clone(),
          base: development.clone(),
          body: notes.text().unwrap_or_default().to_string(),
        },
      )?,
    };

    self.vcs.switch_branch(development, false)?;
    guard.disarm();

    tracing::info!(number = pr.number, "dev merge pull request ready");
    Ok(Outcome {
      pull_request: Some(pr.number),
      branch: Some(branch.name),
      version: Some(version),
      ..Outcome::default()
    })
  }

  fn stamp_artifacts(
    &self,
    host: &dyn CodeHost,
    ctx: &RepositoryContext,
    version: ModuleVersion,
    notes: &ReleaseNotes,
  ) -> ReleaseResult<()> {
    self.artifacts().apply(&version, notes, self.today)?;
    self.regenerate_docs(host, ctx)
  }

  /// Stash whatever a failed stamp left behind so the branch guard doesn't
  /// carry it onto the original branch
  fn shelve_partial_edits(&self, branch: &str) {
    let message = format!("stig-release: unfinished edits on {}", branch);
    match self.vcs.stash_changes(&message) {
      Ok(true) => tracing::warn!(branch, "stashed partial release edits; `git stash list` shows them"),
      Ok(false) => {}
      Err(e) => tracing::warn!(branch, error = %e, "could not stash partial release edits"),
    }
  }

  /// Merge a dev-merge pull request
  ///
  /// Lookup and merge failures follow `release.completion_errors`: with
  /// `suppress` they are logged and the outcome carries no pull request.
  pub fn dev_merge_complete(&self, number: u64) -> ReleaseResult<Outcome> {
    let ctx = self.resolve_context()?;
    let host = self.connector.connect(&ctx)?;

    let merged = host
      .get_pull_request(&ctx, number)
      .and_then(|pr| host.merge_pull_request(&ctx, pr.number, &self.merge_request()));

    match (merged, self.config.release.completion_errors) {
      (Ok(pr), _) => {
        tracing::info!(number = pr.number, merged = pr.merged, "dev merge completed");
        Ok(Outcome {
          pull_request: Some(pr.number),
          branch: Some(pr.head_ref),
          ..Outcome::default()
        })
      }
      (Err(e), CompletionErrorPolicy::Suppress) => {
        tracing::warn!(number, error = %e, "dev merge failed, error suppressed");
        Ok(Outcome::default())
      }
      (Err(e), CompletionErrorPolicy::Propagate) => Err(e),
    }
  }
}

//! Release state machine
//!
//! Two workflows, each split into a start and a complete step:
//!
//! ```text
//! Dev-Merge:  start(kind, version)          complete(pr)
//!             branch off dev ──PR──> dev     merge PR
//!
//! Release:    start([--wait])               complete(pr)
//!             CI green on dev ──PR──> master merge PR, tag + publish release,
//!                                            delete {version}-Release
//! ```
//!
//! # Invariants
//!
//! 1. **Validate before mutating the remote**: context, credential, version
//!    and release notes are all checked before the first push or API write.
//! 2. **Re-entry is safe**: an existing branch, open pull request or release
//!    for the same version is reused rather than duplicated. Nothing is rolled
//!    back after a remote write; rerunning the step finishes the job.
//! 3. **Checkout is restored**: `BranchGuard` returns to the original branch
//!    (without pulling) however the workflow exits.

pub mod branch;
pub mod dev_merge;
pub mod guard;
pub mod promote;
pub mod report;

pub use branch::{BranchKind, ReleaseBranch};
pub use guard::BranchGuard;

use crate::artifacts::contributors;
use crate::artifacts::file_hash;
use crate::artifacts::{ReleaseArtifactSet, manifest};
use crate::core::config::ReleaseConfig;
use crate::core::context::RepositoryContext;
use crate::core::error::{ReleaseResult, ResultExt};
use crate::core::vcs::Vcs;
use crate::core::version::ModuleVersion;
use crate::credential::CredentialStore;
use crate::github::{CodeHost, GitHubClient, MergeRequest, PollPolicy, Sleeper};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;

/// Commit title of every merge the workflows perform
pub const MERGE_COMMIT_TITLE: &str = "Merge release pull request";

/// Commit message of every merge the workflows perform
pub const MERGE_COMMIT_MESSAGE: &str = "Merged by stig-release";

/// Builds an authenticated API client once the project is known
pub trait HostConnector {
  fn connect(&self, ctx: &RepositoryContext) -> ReleaseResult<Box<dyn CodeHost + '_>>;
}

/// Loads the stored credential and hands it to a `GitHubClient`
pub struct CredentialConnector {
  store: CredentialStore,
}

impl CredentialConnector {
  pub fn new(store: CredentialStore) -> Self {
    Self { store }
  }
}

impl HostConnector for CredentialConnector {
  fn connect(&self, ctx: &RepositoryContext) -> ReleaseResult<Box<dyn CodeHost + '_>> {
    let credential = self.store.load()?;
    tracing::debug!(project = %ctx.name, "connecting to code host");
    Ok(Box::new(GitHubClient::new(&credential)?))
  }
}

/// What a workflow step ended with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
  /// Pull request opened, reused or merged; `None` when completion errors
  /// were suppressed
  pub pull_request: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub branch: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub version: Option<ModuleVersion>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub release_tag: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub release_url: Option<String>,
}

/// Drives the workflows against one checkout
pub struct Orchestrator<'a> {
  pub(crate) config: &'a ReleaseConfig,
  pub(crate) vcs: &'a dyn Vcs,
  pub(crate) connector: &'a dyn HostConnector,
  pub(crate) sleeper: &'a dyn Sleeper,
  pub(crate) today: NaiveDate,
}

impl<'a> Orchestrator<'a> {
  pub fn new(
    config: &'a ReleaseConfig,
    vcs: &'a dyn Vcs,
    connector: &'a dyn HostConnector,
    sleeper: &'a dyn Sleeper,
  ) -> Self {
    Self {
      config,
      vcs,
      connector,
      sleeper,
      today: chrono::Local::now().date_naive(),
    }
  }

  /// Date stamped on promoted changelog sections
  pub fn with_date(mut self, today: NaiveDate) -> Self {
    self.today = today;
    self
  }

  pub(crate) fn resolve_context(&self) -> ReleaseResult<RepositoryContext> {
    RepositoryContext::resolve(self.vcs, &self.config.project)
  }

  pub(crate) fn artifacts(&self) -> ReleaseArtifactSet {
    ReleaseArtifactSet::new(self.vcs.work_tree(), &self.config.artifacts)
  }

  pub(crate) fn poll_policy(&self) -> PollPolicy {
    PollPolicy::from(&self.config.polling)
  }

  pub(crate) fn merge_request(&self) -> MergeRequest {
    MergeRequest {
      title: MERGE_COMMIT_TITLE.to_string(),
      message: MERGE_COMMIT_MESSAGE.to_string(),
      method: self.config.release.merge_method,
    }
  }

  /// Fetch `reference` first when it names a branch of the configured remote
  pub(crate) fn refresh(&self, reference: &str) -> ReleaseResult<()> {
    let prefix = format!("{}/", self.config.branches.remote);
    if let Some(branch) = reference.strip_prefix(&prefix) {
      self.vcs.fetch(branch)?;
    }
    Ok(())
  }

  /// Manifest version on the stable line, `0.0.0.0` when there is none
  ///
  /// The remote branch is fetched first so the gate never compares against
  /// a stale tracking ref.
  pub(crate) fn published_version(&self) -> ReleaseResult<ModuleVersion> {
    let reference = &self.config.branches.published_ref;
    let artifacts = self.artifacts();
    self.refresh(reference)?;

    let Some(text) = self.vcs.read_file_at_ref(reference, artifacts.manifest_relative())? else {
      tracing::warn!(reference = %reference, "no manifest on the stable line, treating published version as 0.0.0.0");
      return Ok(ModuleVersion::default());
    };

    match manifest::read_version(&text)? {
      Some(version) => {
        tracing::info!(%version, reference = %reference, "published version");
        Ok(version)
      }
      None => {
        tracing::warn!(reference = %reference, "manifest has no ModuleVersion, treating published version as 0.0.0.0");
        Ok(ModuleVersion::default())
      }
    }
  }

  /// Rewrite the README contributor list and the file-hash table
  pub(crate) fn regenerate_docs(&self, host: &dyn CodeHost, ctx: &RepositoryContext) -> ReleaseResult<()> {
    let root = self.vcs.work_tree();
    let artifacts = &self.config.artifacts;

    let readme = root.join(&artifacts.readme);
    if readme.exists() {
      let set = contributors::collect_contributors(
        host,
        ctx,
        &self.config.branches.development,
        self.config.contributors.max_pages,
        &self.config.contributors.allowlist,
      )?;
      let profile_root = format!("https://{}", self.config.project.host);
      let text = fs::read_to_string(&readme).with_context(|| format!("Failed to read {}", readme.display()))?;
      let updated = contributors::update_readme(&text, &set.render_markdown(&profile_root));
      if updated != text {
        fs::write(&readme, updated).with_context(|| format!("Failed to write {}", readme.display()))?;
      }
    } else {
      tracing::debug!(path = %readme.display(), "no README, skipping contributors");
    }

    if let Some(target) = &artifacts.file_hashes {
      let hash_root = root.join(&artifacts.hash_root);
      if hash_root.is_dir() {
        let table = file_hash::render_table(&file_hash::hash_tree(&hash_root)?);
        let target = root.join(target);
        fs::write(&target, table).with_context(|| format!("Failed to write {}", target.display()))?;
      } else {
        tracing::debug!(path = %hash_root.display(), "no data directory, skipping file hashes");
      }
    }

    Ok(())
  }
}

//! CLI commands for stig-release
//!
//! - **dev_merge**: start/complete a feature or hotfix merge into dev
//! - **release**: start/complete promotion of dev to the stable line
//! - **status**: where the checkout and the development line stand
//! - **credential**: store the encrypted API token
//!
//! Every workflow command opens a `Workspace` once: the working directory is
//! moved to the work tree for the duration of the command and restored
//! afterwards, whatever the outcome.

pub mod credential;
pub mod dev_merge;
pub mod release;
pub mod status;

pub use credential::run_credential_store;
pub use dev_merge::{run_dev_merge_complete, run_dev_merge_start};
pub use release::{run_release_complete, run_release_start};
pub use status::run_status;

use crate::core::config::{BranchConfig, ReleaseConfig};
use crate::core::error::{ReleaseResult, ResultExt};
use crate::core::vcs::{SystemGit, Vcs};
use crate::credential::CredentialStore;
use crate::release::{CredentialConnector, Outcome};
use std::env;
use std::path::{Path, PathBuf};

/// Options shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
  /// Repository path (default: current directory)
  pub repo: Option<PathBuf>,
  /// Explicit config file
  pub config: Option<PathBuf>,
  /// Explicit credential file
  pub credential: Option<PathBuf>,
  /// Print machine-readable output
  pub json: bool,
}

impl GlobalOptions {
  /// Credential location: flag, then config, then the default path
  pub fn credential_store(&self, config: Option<&ReleaseConfig>) -> CredentialStore {
    let configured = config.and_then(|c| c.credential.path.as_deref());
    CredentialStore::at(self.credential.as_deref().or(configured))
  }
}

/// Restores the process working directory when dropped
pub struct LocationGuard {
  original: PathBuf,
}

impl LocationGuard {
  /// Change into `path`, remembering where we were
  pub fn enter(path: &Path) -> ReleaseResult<Self> {
    let original = env::current_dir().context("Failed to get current directory")?;
    env::set_current_dir(path).with_context(|| format!("Failed to change directory to {}", path.display()))?;
    Ok(Self { original })
  }
}

impl Drop for LocationGuard {
  fn drop(&mut self) {
    if let Err(e) = env::set_current_dir(&self.original) {
      tracing::warn!(path = %self.original.display(), error = %e, "could not restore working directory");
    }
  }
}

/// An opened checkout with its configuration
pub struct Workspace {
  pub config: ReleaseConfig,
  pub git: SystemGit,
  pub connector: CredentialConnector,
  _location: LocationGuard,
}

impl Workspace {
  pub fn open(options: &GlobalOptions) -> ReleaseResult<Self> {
    let start = match &options.repo {
      Some(path) => path.clone(),
      None => env::current_dir().context("Failed to get current directory")?,
    };

    // Locate the work tree first; the config lives at its root
    let root = SystemGit::open(&start, BranchConfig::default())?.work_tree().to_path_buf();

    let config = match &options.config {
      Some(path) => ReleaseConfig::load_file(path)?,
      None => ReleaseConfig::load(&root)?,
    };
    let git = SystemGit::open(&root, config.branches.clone())?;
    let connector = CredentialConnector::new(options.credential_store(Some(&config)));
    let location = LocationGuard::enter(&root)?;

    tracing::debug!(root = %root.display(), "opened workspace");
    Ok(Self {
      config,
      git,
      connector,
      _location: location,
    })
  }
}

/// Print a workflow outcome: the pull request number, or JSON
pub fn print_outcome(outcome: &Outcome, json: bool) -> ReleaseResult<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    return Ok(());
  }

  match outcome.pull_request {
    Some(number) => println!("{}", number),
    None => eprintln!("⚠️  No pull request was merged (API errors suppressed)"),
  }
  if let Some(url) = &outcome.release_url {
    eprintln!("🚀 Published {}", url);
  }
  Ok(())
}

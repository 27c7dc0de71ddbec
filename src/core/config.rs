use crate::core::error::{ConfigError, ReleaseError, ReleaseResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for stig-release
/// Searched in order: release.toml, .release.toml, .config/release.toml
///
/// Every section has defaults, so a missing file means "the upstream project
/// with its usual layout".
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReleaseConfig {
  #[serde(default)]
  pub project: ProjectConfig,
  #[serde(default)]
  pub branches: BranchConfig,
  #[serde(default)]
  pub artifacts: ArtifactConfig,
  #[serde(default)]
  pub release: ReleaseSettings,
  #[serde(default)]
  pub polling: PollingConfig,
  #[serde(default)]
  pub contributors: ContributorConfig,
  #[serde(default)]
  pub credential: CredentialConfig,
}

/// Identity of the project this checkout must belong to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
  /// Repository name; when set the remote must end in exactly this name
  #[serde(default = "default_project_name")]
  pub name: Option<String>,

  /// Web host of the code-hosting service
  #[serde(default = "default_host")]
  pub host: String,

  /// Owner/organisation path segment
  #[serde(default = "default_namespace")]
  pub namespace: String,

  /// API host; defaults to `api.{host}`
  #[serde(default)]
  pub api_host: Option<String>,
}

fn default_project_name() -> Option<String> {
  Some("PowerStig".to_string())
}

fn default_host() -> String {
  "github.com".to_string()
}

fn default_namespace() -> String {
  "microsoft".to_string()
}

impl Default for ProjectConfig {
  fn default() -> Self {
    Self {
      name: default_project_name(),
      host: default_host(),
      namespace: default_namespace(),
      api_host: None,
    }
  }
}

impl ProjectConfig {
  pub fn api_host(&self) -> String {
    self.api_host.clone().unwrap_or_else(|| format!("api.{}", self.host))
  }

  /// Canonical web prefix a remote must start with
  pub fn expected_prefix(&self) -> String {
    match &self.name {
      Some(name) => format!("https://{}/{}/{}", self.host, self.namespace, name),
      None => format!("https://{}/{}/", self.host, self.namespace),
    }
  }
}

/// Branch layout of the repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchConfig {
  /// Shared development line
  #[serde(default = "default_development")]
  pub development: String,

  /// Stable line releases are cut from
  #[serde(default = "default_stable")]
  pub stable: String,

  /// Remote used for pull/push/prune
  #[serde(default = "default_remote")]
  pub remote: String,

  /// Ref whose manifest holds the currently published version
  #[serde(default = "default_published_ref")]
  pub published_ref: String,
}

fn default_development() -> String {
  "dev".to_string()
}

fn default_stable() -> String {
  "master".to_string()
}

fn default_remote() -> String {
  "origin".to_string()
}

fn default_published_ref() -> String {
  "origin/master".to_string()
}

impl Default for BranchConfig {
  fn default() -> Self {
    Self {
      development: default_development(),
      stable: default_stable(),
      remote: default_remote(),
      published_ref: default_published_ref(),
    }
  }
}

/// Paths of the files a release touches, relative to the work tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
  #[serde(default = "default_changelog")]
  pub changelog: PathBuf,
  #[serde(default = "default_manifest")]
  pub manifest: PathBuf,
  #[serde(default = "default_build_config")]
  pub build_config: PathBuf,
  /// Document holding the `## Contributors` section
  #[serde(default = "default_readme")]
  pub readme: PathBuf,
  /// Generated file-hash table; `None` disables regeneration
  #[serde(default = "default_file_hashes")]
  pub file_hashes: Option<PathBuf>,
  /// Directory whose files are hashed
  #[serde(default = "default_hash_root")]
  pub hash_root: PathBuf,
}

fn default_changelog() -> PathBuf {
  PathBuf::from("CHANGELOG.md")
}

fn default_manifest() -> PathBuf {
  PathBuf::from("PowerStig.psd1")
}

fn default_build_config() -> PathBuf {
  PathBuf::from("appveyor.yml")
}

fn default_readme() -> PathBuf {
  PathBuf::from("README.md")
}

fn default_file_hashes() -> Option<PathBuf> {
  Some(PathBuf::from("FILEHASH.md"))
}

fn default_hash_root() -> PathBuf {
  PathBuf::from("source/StigData/Processed")
}

impl Default for ArtifactConfig {
  fn default() -> Self {
    Self {
      changelog: default_changelog(),
      manifest: default_manifest(),
      build_config: default_build_config(),
      readme: default_readme(),
      file_hashes: default_file_hashes(),
      hash_root: default_hash_root(),
    }
  }
}

/// How pull requests are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
  #[default]
  Merge,
  Squash,
  Rebase,
}

impl MergeMethod {
  /// Wire form (always lower case)
  pub fn as_str(&self) -> &'static str {
    match self {
      MergeMethod::Merge => "merge",
      MergeMethod::Squash => "squash",
      MergeMethod::Rebase => "rebase",
    }
  }
}

impl std::str::FromStr for MergeMethod {
  type Err = ReleaseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "merge" => Ok(MergeMethod::Merge),
      "squash" => Ok(MergeMethod::Squash),
      "rebase" => Ok(MergeMethod::Rebase),
      other => Err(ReleaseError::Config(ConfigError::InvalidField {
        field: "merge_method".to_string(),
        reason: format!("'{}' is not one of merge, squash, rebase", other),
      })),
    }
  }
}

/// What dev-merge completion does with API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompletionErrorPolicy {
  /// Restore the checkout, then return the error
  #[default]
  Propagate,
  /// Restore the checkout, log the error and report no merge
  Suppress,
}

/// Workflow switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSettings {
  /// Suffix appended to the version to form the release tag
  #[serde(default = "default_tag_suffix")]
  pub tag_suffix: String,

  /// Require and carry changelog notes through the dev-merge
  #[serde(default = "default_true")]
  pub include_release_notes: bool,

  #[serde(default)]
  pub merge_method: MergeMethod,

  #[serde(default)]
  pub completion_errors: CompletionErrorPolicy,
}

fn default_tag_suffix() -> String {
  "-PSGallery".to_string()
}

fn default_true() -> bool {
  true
}

impl Default for ReleaseSettings {
  fn default() -> Self {
    Self {
      tag_suffix: default_tag_suffix(),
      include_release_notes: true,
      merge_method: MergeMethod::default(),
      completion_errors: CompletionErrorPolicy::default(),
    }
  }
}

/// Bounds for ref-status polling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
  #[serde(default = "default_interval_secs")]
  pub interval_secs: u64,
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,
}

fn default_interval_secs() -> u64 {
  30
}

fn default_max_attempts() -> u32 {
  30
}

impl Default for PollingConfig {
  fn default() -> Self {
    Self {
      interval_secs: default_interval_secs(),
      max_attempts: default_max_attempts(),
    }
  }
}

impl PollingConfig {
  pub fn interval(&self) -> Duration {
    Duration::from_secs(self.interval_secs)
  }
}

/// A contributor listed regardless of what the API reports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowlistEntry {
  pub login: String,
  #[serde(default)]
  pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorConfig {
  /// Contributors from before the project moved hosts
  #[serde(default)]
  pub allowlist: Vec<AllowlistEntry>,

  /// Upper bound on closed-PR pages fetched (100 per page)
  #[serde(default = "default_max_pages")]
  pub max_pages: u32,
}

fn default_max_pages() -> u32 {
  10
}

impl Default for ContributorConfig {
  fn default() -> Self {
    Self {
      allowlist: Vec::new(),
      max_pages: default_max_pages(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CredentialConfig {
  /// Encrypted token file; defaults under the user profile
  #[serde(default)]
  pub path: Option<PathBuf>,
}

impl ReleaseConfig {
  /// Find config file in search order: release.toml, .release.toml, .config/release.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("release.toml"),
      path.join(".release.toml"),
      path.join(".config").join("release.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from the work tree, falling back to defaults when absent
  pub fn load(path: &Path) -> ReleaseResult<Self> {
    match Self::find_config_path(path) {
      Some(config_path) => Self::load_file(&config_path),
      None => {
        tracing::debug!(root = %path.display(), "no release.toml found, using defaults");
        Ok(Self::default())
      }
    }
  }

  /// Load config from an explicit file
  pub fn load_file(config_path: &Path) -> ReleaseResult<Self> {
    let content = fs::read_to_string(config_path).map_err(|e| {
      ReleaseError::Config(ConfigError::Invalid {
        path: config_path.to_path_buf(),
        reason: e.to_string(),
      })
    })?;
    let config: ReleaseConfig = toml_edit::de::from_str(&content).map_err(|e| {
      ReleaseError::Config(ConfigError::Invalid {
        path: config_path.to_path_buf(),
        reason: e.to_string(),
      })
    })?;

    config.validate()?;
    tracing::debug!(path = %config_path.display(), "loaded configuration");
    Ok(config)
  }

  pub fn validate(&self) -> ReleaseResult<()> {
    let invalid = |field: &str, reason: &str| {
      Err(ReleaseError::Config(ConfigError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
      }))
    };

    if self.project.host.trim().is_empty() {
      return invalid("project.host", "must not be empty");
    }
    if self.project.host.contains('/') {
      return invalid("project.host", "must be a bare host name");
    }
    if self.project.namespace.trim().is_empty() {
      return invalid("project.namespace", "must not be empty");
    }
    if self.branches.development.is_empty() || self.branches.stable.is_empty() {
      return invalid("branches", "development and stable must be set");
    }
    if self.branches.development.eq_ignore_ascii_case(&self.branches.stable) {
      return invalid("branches", "development and stable must differ");
    }
    if self.polling.max_attempts == 0 {
      return invalid("polling.max_attempts", "must be at least 1");
    }
    if self.contributors.max_pages == 0 {
      return invalid("contributors.max_pages", "must be at least 1");
    }

    Ok(())
  }
}

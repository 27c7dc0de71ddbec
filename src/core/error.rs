//! Error types for stig-release with contextual messages and exit codes
//!
//! Every workflow gate has its own variant so callers (and tests) can tell a
//! version problem from a remote failure without matching on strings. Each
//! error can carry a help message that `print_error` shows below it.

use crate::core::version::ModuleVersion;
use crate::github::RefState;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Exit codes for stig-release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files, credential)
  User = 1,
  /// System error (git, network, I/O)
  System = 2,
  /// Workflow gate refused to continue (version, notes, CI state, timeout)
  Gate = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for stig-release
#[derive(Debug)]
pub enum ReleaseError {
  /// Repository is not the expected project, or git is unavailable
  Context(ContextError),

  /// Requested version is invalid or not newer than the published one
  Version(VersionError),

  /// The changelog has nothing under its Unreleased heading
  MissingReleaseNotes { changelog: PathBuf },

  /// The API credential is missing or cannot be decrypted
  Credential(CredentialError),

  /// Branch does not exist locally or on the remote
  BranchNotFound { name: String },

  /// Ref status stayed pending for the whole polling window
  ApiTimeout {
    reference: String,
    attempts: u32,
    elapsed: Duration,
  },

  /// The code host rejected or failed a REST call
  Remote(RemoteError),

  /// Development line is not in a success state at release start
  NotMergeable { branch: String, state: RefState },

  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ReleaseError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ReleaseError::Message { message, context, help } => ReleaseError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ReleaseError::Io(err) => ReleaseError::Message {
        message: format!("I/O error: {}", err),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ReleaseError::Context(_) => ExitCode::User,
      ReleaseError::Credential(_) => ExitCode::User,
      ReleaseError::Config(_) => ExitCode::User,
      ReleaseError::BranchNotFound { .. } => ExitCode::User,
      ReleaseError::Message { .. } => ExitCode::User,
      ReleaseError::Version(_) => ExitCode::Gate,
      ReleaseError::MissingReleaseNotes { .. } => ExitCode::Gate,
      ReleaseError::NotMergeable { .. } => ExitCode::Gate,
      ReleaseError::ApiTimeout { .. } => ExitCode::Gate,
      ReleaseError::Remote(_) => ExitCode::System,
      ReleaseError::Git(_) => ExitCode::System,
      ReleaseError::Io(_) => ExitCode::System,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ReleaseError::Context(e) => e.help_message(),
      ReleaseError::Version(e) => e.help_message(),
      ReleaseError::Credential(e) => e.help_message(),
      ReleaseError::Config(e) => e.help_message(),
      ReleaseError::Git(e) => e.help_message(),
      ReleaseError::Remote(e) => e.help_message(),
      ReleaseError::MissingReleaseNotes { .. } => {
        Some("Describe the changes under the '## [Unreleased]' heading of the changelog, then retry.".to_string())
      }
      ReleaseError::BranchNotFound { name } => Some(format!(
        "Fetch the remote (`git fetch --prune`) or check the spelling of '{}'.",
        name
      )),
      ReleaseError::NotMergeable { .. } => {
        Some("Wait for CI on the development branch to go green, or rerun with --wait.".to_string())
      }
      ReleaseError::ApiTimeout { .. } => {
        Some("CI did not report a final status in time. Check the build, then rerun the same command.".to_string())
      }
      ReleaseError::Message { help, .. } => help.clone(),
      ReleaseError::Io(_) => None,
    }
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::Context(e) => write!(f, "{}", e),
      ReleaseError::Version(e) => write!(f, "{}", e),
      ReleaseError::MissingReleaseNotes { changelog } => {
        write!(f, "No release notes found in the Unreleased section of {}", changelog.display())
      }
      ReleaseError::Credential(e) => write!(f, "{}", e),
      ReleaseError::BranchNotFound { name } => write!(f, "Branch '{}' not found locally or on the remote", name),
      ReleaseError::ApiTimeout {
        reference,
        attempts,
        elapsed,
      } => write!(
        f,
        "Status of '{}' still pending after {} checks ({}s elapsed)",
        reference,
        attempts,
        elapsed.as_secs()
      ),
      ReleaseError::Remote(e) => write!(f, "{}", e),
      ReleaseError::NotMergeable { branch, state } => {
        write!(f, "Branch '{}' is not mergeable: status is '{}'", branch, state)
      }
      ReleaseError::Config(e) => write!(f, "{}", e),
      ReleaseError::Git(e) => write!(f, "{}", e),
      ReleaseError::Io(e) => write!(f, "I/O error: {}", e),
      ReleaseError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ReleaseError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ReleaseError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for ReleaseError {
  fn from(err: io::Error) -> Self {
    ReleaseError::Io(err)
  }
}

impl From<String> for ReleaseError {
  fn from(msg: String) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<&str> for ReleaseError {
  fn from(msg: &str) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<ContextError> for ReleaseError {
  fn from(err: ContextError) -> Self {
    ReleaseError::Context(err)
  }
}

impl From<VersionError> for ReleaseError {
  fn from(err: VersionError) -> Self {
    ReleaseError::Version(err)
  }
}

impl From<CredentialError> for ReleaseError {
  fn from(err: CredentialError) -> Self {
    ReleaseError::Credential(err)
  }
}

impl From<RemoteError> for ReleaseError {
  fn from(err: RemoteError) -> Self {
    ReleaseError::Remote(err)
  }
}

impl From<GitError> for ReleaseError {
  fn from(err: GitError) -> Self {
    ReleaseError::Git(err)
  }
}

impl From<ConfigError> for ReleaseError {
  fn from(err: ConfigError) -> Self {
    ReleaseError::Config(err)
  }
}

impl From<serde_json::Error> for ReleaseError {
  fn from(err: serde_json::Error) -> Self {
    ReleaseError::message(format!("JSON error: {}", err))
  }
}

impl From<regex::Error> for ReleaseError {
  fn from(err: regex::Error) -> Self {
    ReleaseError::message(format!("Pattern error: {}", err))
  }
}

impl From<std::num::ParseIntError> for ReleaseError {
  fn from(err: std::num::ParseIntError) -> Self {
    ReleaseError::message(format!("Parse error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for ReleaseError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    ReleaseError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<std::path::StripPrefixError> for ReleaseError {
  fn from(err: std::path::StripPrefixError) -> Self {
    ReleaseError::message(format!("Path strip prefix error: {}", err))
  }
}

/// Repository context resolution errors
#[derive(Debug)]
pub enum ContextError {
  /// git is not on PATH
  ToolMissing,

  /// Path is not inside a git work tree
  NotARepository { path: PathBuf },

  /// Remote URL is empty or points at another project
  WrongProject { remote: String, expected: String },
}

impl ContextError {
  fn help_message(&self) -> Option<String> {
    match self {
      ContextError::ToolMissing => Some("Install git and make sure it is on PATH.".to_string()),
      ContextError::NotARepository { path } => Some(format!(
        "Run stig-release from a clone of the project, or pass --repo (current: {})",
        path.display()
      )),
      ContextError::WrongProject { expected, .. } => Some(format!(
        "Point the remote at {} or adjust [project] in release.toml.",
        expected
      )),
    }
  }
}

impl fmt::Display for ContextError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ContextError::ToolMissing => write!(f, "git was not found on the system path"),
      ContextError::NotARepository { path } => write!(f, "Not a git repository: {}", path.display()),
      ContextError::WrongProject { remote, expected } => {
        if remote.is_empty() {
          write!(f, "No remote URL configured; expected {}", expected)
        } else {
          write!(f, "Remote '{}' is not the expected project {}", remote, expected)
        }
      }
    }
  }
}

/// Version validation errors
#[derive(Debug)]
pub enum VersionError {
  /// Not a strict four-component version
  Invalid { input: String },

  /// Requested version does not exceed the published one
  NotGreater {
    requested: ModuleVersion,
    published: ModuleVersion,
  },
}

impl VersionError {
  fn help_message(&self) -> Option<String> {
    match self {
      VersionError::Invalid { .. } => Some("Versions have four numeric parts, e.g. 4.2.0.1".to_string()),
      VersionError::NotGreater { published, .. } => Some(format!(
        "Pick a version greater than {} (the version on the stable line).",
        published
      )),
    }
  }
}

impl fmt::Display for VersionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VersionError::Invalid { input } => write!(f, "Invalid module version '{}'", input),
      VersionError::NotGreater { requested, published } => write!(
        f,
        "Version {} must be greater than the published version {}",
        requested, published
      ),
    }
  }
}

/// Credential errors
#[derive(Debug)]
pub enum CredentialError {
  /// No credential file at the expected path, or it is empty
  Missing { path: PathBuf },

  /// Credential exists but could not be decoded or decrypted
  Corrupt { path: PathBuf, reason: String },

  /// No encryption key available to open the credential
  KeyMissing { path: PathBuf },
}

impl CredentialError {
  fn help_message(&self) -> Option<String> {
    match self {
      CredentialError::Missing { .. } | CredentialError::KeyMissing { .. } => {
        Some("Store a token with `stig-release credential store`.".to_string())
      }
      CredentialError::Corrupt { .. } => Some(
        "The credential was written with a different key. Store the token again with `stig-release credential store`."
          .to_string(),
      ),
    }
  }
}

impl fmt::Display for CredentialError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CredentialError::Missing { path } => {
        write!(f, "No API credential found.\nExpected file: {}", path.display())
      }
      CredentialError::Corrupt { path, reason } => {
        write!(f, "API credential at {} is unreadable: {}", path.display(), reason)
      }
      CredentialError::KeyMissing { path } => write!(
        f,
        "No credential key found. Set STIG_RELEASE_KEY or create {}",
        path.display()
      ),
    }
  }
}

/// Failure reported by the code-hosting REST API
#[derive(Debug)]
pub struct RemoteError {
  /// What we were doing, e.g. "create pull request"
  pub operation: String,
  /// HTTP status when the host answered
  pub status: Option<u16>,
  /// Host response body, verbatim
  pub message: String,
}

impl RemoteError {
  fn help_message(&self) -> Option<String> {
    match self.status {
      Some(401) => Some("The token was rejected. Store a fresh one with `stig-release credential store`.".to_string()),
      Some(403) => Some("The token lacks permission for this repository (needs `repo` scope).".to_string()),
      Some(405) => Some("The pull request is not mergeable yet. Check reviews and required checks.".to_string()),
      None => Some("Check network access to the API host.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for RemoteError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.status {
      Some(status) => write!(f, "Failed to {} (HTTP {}): {}", self.operation, status, self.message),
      None => write!(f, "Failed to {}: {}", self.operation, self.message),
    }
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Config file could not be parsed
  Invalid { path: PathBuf, reason: String },

  /// Field has an unusable value
  InvalidField { field: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::Invalid { .. } => Some("Fix the syntax in release.toml or delete it to use defaults.".to_string()),
      ConfigError::InvalidField { field, .. } => Some(format!("Check the value of `{}` in release.toml.", field)),
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::Invalid { path, reason } => {
        write!(f, "Invalid configuration in {}: {}", path.display(), reason)
      }
      ConfigError::InvalidField { field, reason } => {
        write!(f, "Invalid value for {}: {}", field, reason)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Branch operation failed
  BranchError { message: String },

  /// Push failed
  PushFailed {
    remote: String,
    branch: String,
    reason: String,
  },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") || reason.contains("rejected") {
          Some("The remote has commits you don't have. Pull the branch, then rerun the same command.".to_string())
        } else if reason.contains("Permission denied") || reason.contains("403") {
          Some("Check your git credentials for the remote.".to_string())
        } else {
          None
        }
      }
      GitError::CommandFailed { stderr, .. } if stderr.contains("would be overwritten") => {
        Some("Commit or stash local changes first.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr.trim_end())
      }
      GitError::BranchError { message } => {
        write!(f, "Branch operation failed: {}", message)
      }
      GitError::PushFailed { remote, branch, reason } => {
        write!(f, "Push to {}/{} failed: {}", remote, branch, reason.trim_end())
      }
    }
  }
}

/// Result type alias for stig-release
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ReleaseError>,
{
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ReleaseError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

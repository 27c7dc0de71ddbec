//! Repository context - resolve once, pass everywhere
//!
//! # Design
//!
//! `RepositoryContext` is derived from the remote URL at the start of every
//! workflow and handed by reference to each API call. Nothing downstream
//! re-reads the remote, so a run can't switch projects halfway through.
//!
//! ```text
//! remote https://code.example.com/Org/Proj.git
//!   |
//!   v
//! RepositoryContext {
//!   name:         Proj
//!   web_url:      https://code.example.com/Org/Proj
//!   api_base_url: https://api.code.example.com/repos/Org/Proj
//! }
//! ```

use crate::core::config::ProjectConfig;
use crate::core::error::{ContextError, ReleaseResult};
use crate::core::vcs::Vcs;
use serde::Serialize;

/// Identity of the project being released
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryContext {
  /// Repository name (last path segment)
  pub name: String,

  /// Web URL without a `.git` suffix
  pub web_url: String,

  /// REST base for repository-scoped endpoints
  pub api_base_url: String,
}

impl RepositoryContext {
  /// Resolve the context from the checkout's configured remote
  pub fn resolve(vcs: &dyn Vcs, project: &ProjectConfig) -> ReleaseResult<Self> {
    let remote = vcs.remote_url()?;
    let context = Self::from_remote(remote.as_deref().unwrap_or(""), project)?;
    tracing::info!(project = %context.name, api = %context.api_base_url, "resolved repository context");
    Ok(context)
  }

  /// Derive the context from a remote URL, failing closed on any mismatch
  pub fn from_remote(remote: &str, project: &ProjectConfig) -> Result<Self, ContextError> {
    let wrong_project = || ContextError::WrongProject {
      remote: remote.to_string(),
      expected: project.expected_prefix(),
    };

    let remote = remote.trim();
    if remote.is_empty() {
      return Err(wrong_project());
    }

    let web_url = normalize_remote(remote);
    let web_url = web_url.strip_suffix(".git").unwrap_or(&web_url).to_string();

    let host_prefix = format!("https://{}/", project.host);
    if !starts_with_ignore_case(&web_url, &host_prefix) {
      return Err(wrong_project());
    }

    let path = &web_url[host_prefix.len()..];
    let mut segments = path.split('/');
    let (Some(namespace), Some(name), None) = (segments.next(), segments.next(), segments.next()) else {
      return Err(wrong_project());
    };

    if name.is_empty() || !namespace.eq_ignore_ascii_case(&project.namespace) {
      return Err(wrong_project());
    }
    if let Some(expected) = &project.name
      && !name.eq_ignore_ascii_case(expected)
    {
      return Err(wrong_project());
    }

    let api_base_url = format!("https://{}/repos/{}", project.api_host(), path);

    Ok(Self {
      name: name.to_string(),
      web_url,
      api_base_url,
    })
  }

  /// API root (everything before `/repos/`), used for non-repository endpoints
  pub fn api_root(&self) -> &str {
    match self.api_base_url.find("/repos/") {
      Some(idx) => &self.api_base_url[..idx],
      None => &self.api_base_url,
    }
  }
}

/// Turn `git@host:path` and `ssh://git@host/path` into `https://host/path`
fn normalize_remote(remote: &str) -> String {
  if let Some(rest) = remote.strip_prefix("ssh://") {
    let rest = rest.split_once('@').map(|(_, r)| r).unwrap_or(rest);
    return format!("https://{}", rest);
  }
  if !remote.contains("://")
    && let Some((user_host, path)) = remote.split_once(':')
  {
    let host = user_host.split_once('@').map(|(_, h)| h).unwrap_or(user_host);
    return format!("https://{}/{}", host, path);
  }
  remote.to_string()
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
  haystack.len() >= prefix.len()
    && haystack.is_char_boundary(prefix.len())
    && haystack[..prefix.len()].eq_ignore_ascii_case(prefix)
}

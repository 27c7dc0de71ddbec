//! Code-hosting REST layer
//!
//! - **client**: `GitHubClient`, the reqwest-backed `CodeHost`
//! - **poll**: bounded ref-status polling with an injectable `Sleeper`
//!
//! Every operation takes the `RepositoryContext` explicitly; nothing here
//! remembers which project it talked to last.

pub mod client;
pub mod poll;

pub use client::GitHubClient;
pub use poll::{PollPolicy, Sleeper, ThreadSleeper, get_ref_status};

use crate::core::config::MergeMethod;
use crate::core::context::RepositoryContext;
use crate::core::error::ReleaseResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Combined CI status of a ref
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefState {
  Pending,
  Success,
  Failure,
}

impl RefState {
  /// Map the host's state string; `error` counts as failure, anything
  /// unknown as still pending
  pub fn from_wire(state: &str) -> Self {
    match state {
      "success" => RefState::Success,
      "failure" | "error" => RefState::Failure,
      _ => RefState::Pending,
    }
  }
}

impl fmt::Display for RefState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      RefState::Pending => "pending",
      RefState::Success => "success",
      RefState::Failure => "failure",
    };
    f.write_str(s)
  }
}

/// Read-projection of a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
  pub number: u64,
  pub head_ref: String,
  pub base_ref: String,
  pub title: String,
  pub body: String,
  pub state: String,
  pub merged: bool,
  /// Login of the author
  pub author: String,
}

/// Body of `POST /pulls`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
  pub title: String,
  pub head: String,
  pub base: String,
  pub body: String,
}

/// Parameters for merging a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
  pub title: String,
  pub message: String,
  pub method: MergeMethod,
}

/// A published release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
  pub id: u64,
  pub tag_name: String,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub body: Option<String>,
  #[serde(default)]
  pub draft: bool,
  #[serde(default)]
  pub prerelease: bool,
  #[serde(default)]
  pub html_url: String,
}

/// Body of `POST /releases`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRelease {
  pub tag_name: String,
  pub target_commitish: String,
  pub name: String,
  pub body: String,
  pub draft: bool,
  pub prerelease: bool,
}

/// Public profile of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
  pub login: String,
  #[serde(default)]
  pub name: Option<String>,
}

impl UserProfile {
  /// Display name, falling back to the login when the profile has none
  pub fn display_name(&self) -> &str {
    match self.name.as_deref().map(str::trim) {
      Some(name) if !name.is_empty() => name,
      _ => &self.login,
    }
  }
}

/// Page size for list endpoints
pub const PAGE_SIZE: u32 = 100;

/// Operations the workflows need from the code host
pub trait CodeHost {
  /// One page (1-based, `PAGE_SIZE` entries) of closed pull requests into `base`
  fn list_closed_pull_requests(&self, ctx: &RepositoryContext, base: &str, page: u32) -> ReleaseResult<Vec<PullRequest>>;

  /// One page of open pull requests into `base`
  fn list_open_pull_requests(&self, ctx: &RepositoryContext, base: &str, page: u32) -> ReleaseResult<Vec<PullRequest>>;

  fn get_user(&self, ctx: &RepositoryContext, login: &str) -> ReleaseResult<UserProfile>;

  fn create_pull_request(&self, ctx: &RepositoryContext, request: &NewPullRequest) -> ReleaseResult<PullRequest>;

  fn get_pull_request(&self, ctx: &RepositoryContext, number: u64) -> ReleaseResult<PullRequest>;

  /// Merge, then re-read the pull request
  fn merge_pull_request(&self, ctx: &RepositoryContext, number: u64, request: &MergeRequest) -> ReleaseResult<PullRequest>;

  /// Single observation of the combined status of `reference`
  fn ref_state(&self, ctx: &RepositoryContext, reference: &str) -> ReleaseResult<RefState>;

  fn create_release(&self, ctx: &RepositoryContext, request: &NewRelease) -> ReleaseResult<Release>;

  /// Release for `tag`, `None` when there is none yet
  fn find_release_by_tag(&self, ctx: &RepositoryContext, tag: &str) -> ReleaseResult<Option<Release>>;
}

impl<T: CodeHost + ?Sized> CodeHost for &T {
  fn list_closed_pull_requests(&self, ctx: &RepositoryContext, base: &str, page: u32) -> ReleaseResult<Vec<PullRequest>> {
    (**self).list_closed_pull_requests(ctx, base, page)
  }

  fn list_open_pull_requests(&self, ctx: &RepositoryContext, base: &str, page: u32) -> ReleaseResult<Vec<PullRequest>> {
    (**self).list_open_pull_requests(ctx, base, page)
  }

  fn get_user(&self, ctx: &RepositoryContext, login: &str) -> ReleaseResult<UserProfile> {
    (**self).get_user(ctx, login)
  }

  fn create_pull_request(&self, ctx: &RepositoryContext, request: &NewPullRequest) -> ReleaseResult<PullRequest> {
    (**self).create_pull_request(ctx, request)
  }

  fn get_pull_request(&self, ctx: &RepositoryContext, number: u64) -> ReleaseResult<PullRequest> {
    (**self).get_pull_request(ctx, number)
  }

  fn merge_pull_request(&self, ctx: &RepositoryContext, number: u64, request: &MergeRequest) -> ReleaseResult<PullRequest> {
    (**self).merge_pull_request(ctx, number, request)
  }

  fn ref_state(&self, ctx: &RepositoryContext, reference: &str) -> ReleaseResult<RefState> {
    (**self).ref_state(ctx, reference)
  }

  fn create_release(&self, ctx: &RepositoryContext, request: &NewRelease) -> ReleaseResult<Release> {
    (**self).create_release(ctx, request)
  }

  fn find_release_by_tag(&self, ctx: &RepositoryContext, tag: &str) -> ReleaseResult<Option<Release>> {
    (**self).find_release_by_tag(ctx, tag)
  }
}

/// Open pull request from `head` into `base`, matched on exact ref names
///
/// Walks every page of open pull requests; a short page is the last one.
pub fn find_pull_request<H: CodeHost + ?Sized>(
  host: &H,
  ctx: &RepositoryContext,
  head: &str,
  base: &str,
) -> ReleaseResult<Option<PullRequest>> {
  let mut page = 1;
  loop {
    let pulls = host.list_open_pull_requests(ctx, base, page)?;
    let last_page = pulls.len() < PAGE_SIZE as usize;

    if let Some(pr) = pulls.into_iter().find(|pr| pr.head_ref == head && pr.base_ref == base) {
      tracing::debug!(number = pr.number, head, base, page, "found open pull request");
      return Ok(Some(pr));
    }
    if last_page {
      return Ok(None);
    }
    page += 1;
  }
}

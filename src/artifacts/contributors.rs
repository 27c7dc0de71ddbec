//! Contributor list for the README
//!
//! Authors of merged pull requests plus a configured allowlist, keyed by
//! login and ordered by ordinal login.

use crate::core::config::AllowlistEntry;
use crate::core::context::RepositoryContext;
use crate::core::error::ReleaseResult;
use crate::github::{CodeHost, PAGE_SIZE};
use std::collections::{BTreeMap, BTreeSet};

/// One contributor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorRecord {
  pub login: String,
  pub display_name: String,
}

/// Contributors keyed by login
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContributorSet {
  records: BTreeMap<String, ContributorRecord>,
}

impl ContributorSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a record; an existing login keeps its first display name
  pub fn insert(&mut self, record: ContributorRecord) {
    self.records.entry(record.login.clone()).or_insert(record);
  }

  pub fn union(mut self, other: ContributorSet) -> Self {
    for record in other.records.into_values() {
      self.insert(record);
    }
    self
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn logins(&self) -> impl Iterator<Item = &str> {
    self.records.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &ContributorRecord> {
    self.records.values()
  }

  /// Markdown bullet list linking each login under `profile_root`
  pub fn render_markdown(&self, profile_root: &str) -> String {
    let root = profile_root.trim_end_matches('/');
    self
      .iter()
      .map(|c| format!("* [{}]({}/{})\n", c.display_name, root, c.login))
      .collect()
  }
}

/// Logins of everyone with a merged pull request into `base`
///
/// Reads at most `max_pages` pages; stopping at the bound with a full last
/// page means older contributors may be missing, which is logged.
pub fn merged_authors<H: CodeHost + ?Sized>(
  host: &H,
  ctx: &RepositoryContext,
  base: &str,
  max_pages: u32,
) -> ReleaseResult<BTreeSet<String>> {
  let mut authors = BTreeSet::new();

  for page in 1..=max_pages {
    let pulls = host.list_closed_pull_requests(ctx, base, page)?;
    let full_page = pulls.len() >= PAGE_SIZE as usize;

    authors.extend(
      pulls
        .into_iter()
        .filter(|pr| pr.merged && !pr.author.is_empty() && !pr.author.ends_with("[bot]"))
        .map(|pr| pr.author),
    );

    if !full_page {
      return Ok(authors);
    }
    if page == max_pages {
      tracing::warn!(
        max_pages,
        "contributor list may be truncated: stopped after {} pages of pull requests",
        max_pages
      );
    }
  }

  Ok(authors)
}

/// Merged-PR authors (display names looked up) unioned with the allowlist
pub fn collect_contributors<H: CodeHost + ?Sized>(
  host: &H,
  ctx: &RepositoryContext,
  base: &str,
  max_pages: u32,
  allowlist: &[AllowlistEntry],
) -> ReleaseResult<ContributorSet> {
  let authors = merged_authors(host, ctx, base, max_pages)?;

  let mut from_history = ContributorSet::new();
  for login in &authors {
    let profile = host.get_user(ctx, login)?;
    from_history.insert(ContributorRecord {
      login: login.clone(),
      display_name: profile.display_name().to_string(),
    });
  }

  let mut from_allowlist = ContributorSet::new();
  for entry in allowlist {
    let display_name = match &entry.name {
      Some(name) => name.clone(),
      None => host.get_user(ctx, &entry.login)?.display_name().to_string(),
    };
    from_allowlist.insert(ContributorRecord {
      login: entry.login.clone(),
      display_name,
    });
  }

  let contributors = from_history.union(from_allowlist);
  tracing::info!(count = contributors.len(), "collected contributors");
  Ok(contributors)
}

/// Replace the body of the README's `## Contributors` section, appending the
/// section when the README has none
pub fn update_readme(readme: &str, rendered: &str) -> String {
  const HEADING: &str = "## Contributors";

  let start = readme
    .match_indices(HEADING)
    .map(|(idx, _)| idx)
    .find(|&idx| idx == 0 || readme[..idx].ends_with('\n'));

  let Some(start) = start else {
    let mut out = readme.trim_end().to_string();
    if !out.is_empty() {
      out.push_str("\n\n");
    }
    out.push_str(HEADING);
    out.push_str("\n\n");
    out.push_str(rendered);
    return out;
  };

  let body_start = readme[start..].find('\n').map(|i| start + i + 1).unwrap_or(readme.len());
  let body_end = readme[body_start..]
    .match_indices("\n## ")
    .map(|(idx, _)| body_start + idx + 1)
    .next()
    .unwrap_or(readme.len());

  let mut out = String::with_capacity(readme.len() + rendered.len());
  out.push_str(&readme[..body_start]);
  out.push('\n');
  out.push_str(rendered);
  if body_end < readme.len() {
    out.push('\n');
  }
  out.push_str(&readme[body_end..]);
  out
}

//! Changelog sections (Keep a Changelog layout)
//!
//! ```text
//! ## [Unreleased]              ## [Unreleased]
//! * fixed a thing      ==>
//!                              ## [4.2.0.1] - 2024-05-01
//! ## [4.1.9.0] - ...           * fixed a thing
//!                              ## [4.1.9.0] - ...
//! ```

use crate::core::error::ReleaseResult;
use crate::core::version::ModuleVersion;
use chrono::NaiveDate;
use regex::Regex;

const UNRELEASED_HEADING: &str = r"(?mi)^##[ \t]*\[?Unreleased\]?[ \t]*\r?$";

/// Body of the section starting at the heading matched by `heading`
fn section_body(text: &str, heading: &Regex) -> Option<String> {
  let found = heading.find(text)?;
  let rest = &text[found.end()..];
  let end = rest
    .match_indices("\n## ")
    .map(|(idx, _)| idx)
    .next()
    .unwrap_or(rest.len());
  let body = rest[..end].trim();
  (!body.is_empty()).then(|| body.to_string())
}

/// Notes under the Unreleased heading, `None` when missing or empty
pub fn unreleased_notes(text: &str) -> ReleaseResult<Option<String>> {
  let heading = Regex::new(UNRELEASED_HEADING)?;
  Ok(section_body(text, &heading))
}

/// Notes of an already promoted `## [version]` section
pub fn version_notes(text: &str, version: &ModuleVersion) -> ReleaseResult<Option<String>> {
  let heading = Regex::new(&format!(r"(?m)^##[ \t]*\[{}\][^\n]*$", regex::escape(&version.to_string())))?;
  Ok(section_body(text, &heading))
}

/// Move the Unreleased notes under a new dated version heading
///
/// The Unreleased heading stays, empty, above the new section. Returns
/// `None` when the changelog has no Unreleased heading.
pub fn promote_unreleased(text: &str, version: &ModuleVersion, date: NaiveDate) -> ReleaseResult<Option<String>> {
  let heading = Regex::new(UNRELEASED_HEADING)?;
  let Some(found) = heading.find(text) else {
    return Ok(None);
  };

  let mut out = String::with_capacity(text.len() + 32);
  out.push_str(&text[..found.start()]);
  out.push_str("## [Unreleased]\n\n");
  out.push_str(&format!("## [{}] - {}", version, date.format("%Y-%m-%d")));
  out.push_str(&text[found.end()..]);
  Ok(Some(out))
}

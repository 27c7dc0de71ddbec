//! Module manifest (`.psd1`) fields
//!
//! Values are single-quoted strings; a literal `'` is written as `''`.

use crate::core::error::{ReleaseError, ReleaseResult};
use crate::core::version::ModuleVersion;
use regex::{Captures, Regex};

const VERSION_FIELD: &str = r"(?m)^(\s*ModuleVersion\s*=\s*)'([^']*)'";
const NOTES_FIELD: &str = r"(?m)^(\s*ReleaseNotes\s*=\s*)'((?:[^']|'')*)'";

fn missing_field(field: &str) -> ReleaseError {
  ReleaseError::with_help(
    format!("Manifest has no {} entry", field),
    format!("Add `{} = ''` to the module manifest.", field),
  )
}

/// Quote a value for a single-quoted manifest string
pub fn escape(value: &str) -> String {
  value.replace('\'', "''")
}

fn unescape(value: &str) -> String {
  value.replace("''", "'")
}

/// `ModuleVersion`, `None` when the field is absent
pub fn read_version(text: &str) -> ReleaseResult<Option<ModuleVersion>> {
  let field = Regex::new(VERSION_FIELD)?;
  match field.captures(text) {
    Some(caps) => Ok(Some(caps[2].parse()?)),
    None => Ok(None),
  }
}

/// `ReleaseNotes`, unescaped; `None` when the field is absent
pub fn read_release_notes(text: &str) -> ReleaseResult<Option<String>> {
  let field = Regex::new(NOTES_FIELD)?;
  Ok(field.captures(text).map(|caps| unescape(&caps[2])))
}

pub fn set_version(text: &str, version: &ModuleVersion) -> ReleaseResult<String> {
  let field = Regex::new(VERSION_FIELD)?;
  if !field.is_match(text) {
    return Err(missing_field("ModuleVersion"));
  }
  let version = version.to_string();
  Ok(
    field
      .replace(text, |caps: &Captures| format!("{}'{}'", &caps[1], version))
      .into_owned(),
  )
}

pub fn set_release_notes(text: &str, notes: &str) -> ReleaseResult<String> {
  let field = Regex::new(NOTES_FIELD)?;
  if !field.is_match(text) {
    return Err(missing_field("ReleaseNotes"));
  }
  let escaped = escape(notes);
  Ok(
    field
      .replace(text, |caps: &Captures| format!("{}'{}'", &caps[1], escaped))
      .into_owned(),
  )
}

//! CI build configuration version line (`version: 4.2.0.{build}`)

use crate::core::error::{ReleaseError, ReleaseResult};
use crate::core::version::ModuleVersion;
use regex::{Captures, Regex};

const VERSION_LINE: &str = r"(?m)^(\s*version:\s*)\d+\.\d+\.\d+\.\{build\}";

/// Point the build version at `major.minor.build` of `version`
pub fn set_version(text: &str, version: &ModuleVersion) -> ReleaseResult<String> {
  let line = Regex::new(VERSION_LINE)?;
  if !line.is_match(text) {
    return Err(ReleaseError::with_help(
      "Build configuration has no `version: M.m.b.{build}` line",
      "Add a line such as `version: 4.2.0.{build}` to the build configuration.",
    ));
  }
  let pattern = version.build_config_pattern();
  Ok(
    line
      .replace(text, |caps: &Captures| format!("{}{}", &caps[1], pattern))
      .into_owned(),
  )
}

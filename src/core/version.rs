//! Four-component module versions (`major.minor.build.revision`)
//!
//! Comparison is structural: `4.10.0.0` is newer than `4.9.0.0` even though
//! it sorts lower as a string.

use crate::core::error::{ReleaseResult, VersionError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A strict four-part version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ModuleVersion {
  pub major: u32,
  pub minor: u32,
  pub build: u32,
  pub revision: u32,
}

impl ModuleVersion {
  pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
    Self {
      major,
      minor,
      build,
      revision,
    }
  }

  /// Version line used by the CI build config, e.g. `4.2.0.{build}`
  pub fn build_config_pattern(&self) -> String {
    format!("{}.{}.{}.{{build}}", self.major, self.minor, self.build)
  }
}

impl FromStr for ModuleVersion {
  type Err = VersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || VersionError::Invalid { input: s.to_string() };

    let parts: Vec<&str> = s.trim().split('.').collect();
    if parts.len() != 4 {
      return Err(invalid());
    }

    let mut numbers = [0u32; 4];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
      // u32::from_str accepts a leading '+', which a version must not have
      if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
      }
      *slot = part.parse().map_err(|_| invalid())?;
    }

    Ok(Self::new(numbers[0], numbers[1], numbers[2], numbers[3]))
  }
}

impl fmt::Display for ModuleVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
  }
}

impl Serialize for ModuleVersion {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ModuleVersion {
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

/// Gate: a release version must be strictly greater than the published one
pub fn validate_version(requested: ModuleVersion, published: ModuleVersion) -> ReleaseResult<()> {
  if requested > published {
    Ok(())
  } else {
    Err(VersionError::NotGreater { requested, published }.into())
  }
}

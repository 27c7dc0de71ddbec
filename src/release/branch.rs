//! Release branch naming

use crate::core::config::BranchConfig;
use crate::core::version::ModuleVersion;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

/// What a release branch is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BranchKind {
  /// New functionality merged into the development line
  Feature,
  /// Urgent fix merged into the development line
  Hotfix,
  /// Branch a release is staged on; removed once the release completes
  #[value(skip)]
  DevRelease,
}

impl fmt::Display for BranchKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      BranchKind::Feature => "feature",
      BranchKind::Hotfix => "hotfix",
      BranchKind::DevRelease => "dev-release",
    };
    f.write_str(s)
  }
}

/// A branch cut from the development line for one version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseBranch {
  pub name: String,
  pub base_branch: String,
  pub kind: BranchKind,
}

impl ReleaseBranch {
  pub fn new(kind: BranchKind, version: &ModuleVersion, branches: &BranchConfig) -> Self {
    let name = match kind {
      BranchKind::Feature => version.to_string(),
      BranchKind::Hotfix | BranchKind::DevRelease => format!("{}-Release", version),
    };
    Self {
      name,
      base_branch: branches.development.clone(),
      kind,
    }
  }

  /// Every branch a dev merge of `version` may have used, whatever its kind
  pub fn for_version(version: &ModuleVersion, branches: &BranchConfig) -> [Self; 2] {
    [
      Self::new(BranchKind::DevRelease, version, branches),
      Self::new(BranchKind::Feature, version, branches),
    ]
  }
}

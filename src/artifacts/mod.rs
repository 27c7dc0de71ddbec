//! Local files a release rewrites
//!
//! - **changelog**: Unreleased notes and version sections
//! - **manifest**: `ModuleVersion` / `ReleaseNotes` in the module manifest
//! - **build_config**: CI build version line
//! - **contributors**: README contributor section
//! - **file_hash**: hash table of processed data files
//!
//! `ReleaseArtifactSet` updates changelog, manifest and build config as one
//! unit: every new text is computed before anything is written, and a failed
//! write puts back the files already written.

pub mod build_config;
pub mod changelog;
pub mod contributors;
pub mod file_hash;
pub mod manifest;

use crate::core::config::ArtifactConfig;
use crate::core::error::{ReleaseError, ReleaseResult, ResultExt};
use crate::core::version::ModuleVersion;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

/// Where the release notes for this run came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseNotes {
  /// Fresh notes under the Unreleased heading; the changelog gets promoted
  Unreleased(String),
  /// Notes of a `[version]` section promoted by an earlier run
  Promoted(String),
  /// Release notes disabled
  Disabled,
}

impl ReleaseNotes {
  pub fn text(&self) -> Option<&str> {
    match self {
      ReleaseNotes::Unreleased(text) | ReleaseNotes::Promoted(text) => Some(text),
      ReleaseNotes::Disabled => None,
    }
  }
}

/// Changelog, manifest and build config of one work tree
#[derive(Debug, Clone)]
pub struct ReleaseArtifactSet {
  root: PathBuf,
  config: ArtifactConfig,
}

struct PendingWrite {
  path: PathBuf,
  original: String,
  updated: String,
}

impl ReleaseArtifactSet {
  pub fn new(root: &Path, config: &ArtifactConfig) -> Self {
    Self {
      root: root.to_path_buf(),
      config: config.clone(),
    }
  }

  pub fn changelog_path(&self) -> PathBuf {
    self.root.join(&self.config.changelog)
  }

  pub fn manifest_path(&self) -> PathBuf {
    self.root.join(&self.config.manifest)
  }

  /// Manifest path relative to the work tree, as git wants it
  pub fn manifest_relative(&self) -> &Path {
    &self.config.manifest
  }

  pub fn build_config_path(&self) -> PathBuf {
    self.root.join(&self.config.build_config)
  }

  fn read(path: &Path) -> ReleaseResult<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
  }

  pub fn read_changelog(&self) -> ReleaseResult<String> {
    Self::read(&self.changelog_path())
  }

  pub fn read_manifest(&self) -> ReleaseResult<String> {
    Self::read(&self.manifest_path())
  }

  /// Release notes for `version`
  ///
  /// Unreleased notes win; when that section is empty a section already
  /// promoted for `version` is reused so a rerun after a partial failure
  /// still finds its notes.
  pub fn release_notes(&self, version: &ModuleVersion, enabled: bool) -> ReleaseResult<ReleaseNotes> {
    if !enabled {
      return Ok(ReleaseNotes::Disabled);
    }

    let text = self.read_changelog()?;
    if let Some(notes) = changelog::unreleased_notes(&text)? {
      return Ok(ReleaseNotes::Unreleased(notes));
    }
    if let Some(notes) = changelog::version_notes(&text, version)? {
      tracing::info!(%version, "reusing notes already promoted in the changelog");
      return Ok(ReleaseNotes::Promoted(notes));
    }

    Err(ReleaseError::MissingReleaseNotes {
      changelog: self.changelog_path(),
    })
  }

  /// Version and notes recorded in the manifest on disk
  pub fn manifest_release(&self) -> ReleaseResult<(ModuleVersion, String)> {
    let text = self.read_manifest()?;
    let version = manifest::read_version(&text)?.ok_or_else(|| {
      ReleaseError::message(format!(
        "No ModuleVersion in {}",
        self.manifest_path().display()
      ))
    })?;
    let notes = manifest::read_release_notes(&text)?.unwrap_or_default();
    Ok((version, notes))
  }

  /// Stamp `version` and `notes` into every artifact
  pub fn apply(&self, version: &ModuleVersion, notes: &ReleaseNotes, date: NaiveDate) -> ReleaseResult<()> {
    let mut writes = Vec::new();

    if let ReleaseNotes::Unreleased(_) = notes {
      let path = self.changelog_path();
      let original = Self::read(&path)?;
      if let Some(updated) = changelog::promote_unreleased(&original, version, date)? {
        writes.push(PendingWrite {
          path,
          original,
          updated,
        });
      }
    }

    let path = self.manifest_path();
    let original = Self::read(&path)?;
    let mut updated = manifest::set_version(&original, version)?;
    if let Some(text) = notes.text() {
      updated = manifest::set_release_notes(&updated, text)?;
    }
    writes.push(PendingWrite {
      path,
      original,
      updated,
    });

    let path = self.build_config_path();
    if path.exists() {
      let original = Self::read(&path)?;
      let updated = build_config::set_version(&original, version)?;
      writes.push(PendingWrite {
        path,
        original,
        updated,
      });
    } else {
      tracing::warn!(path = %path.display(), "build configuration not found, skipping");
    }

    Self::commit(writes)?;
    tracing::info!(%version, "updated release artifacts");
    Ok(())
  }

  fn commit(writes: Vec<PendingWrite>) -> ReleaseResult<()> {
    let writes: Vec<_> = writes.into_iter().filter(|w| w.original != w.updated).collect();

    for (idx, write) in writes.iter().enumerate() {
      if let Err(e) = fs::write(&write.path, &write.updated) {
        for done in &writes[..idx] {
          if let Err(restore) = fs::write(&done.path, &done.original) {
            tracing::warn!(path = %done.path.display(), error = %restore, "failed to restore file");
          }
        }
        return Err(ReleaseError::from(e).context(format!("Failed to write {}", write.path.display())));
      }
    }
    Ok(())
  }
}

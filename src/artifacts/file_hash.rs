//! SHA-256 table of the processed STIG data files

use crate::core::error::{ReleaseResult, ResultExt};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Hash of one file, path relative to the hashed root with `/` separators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHash {
  pub path: String,
  pub sha256: String,
}

/// Regular files under `dir`; symlinked directories are not descended into
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> ReleaseResult<()> {
  let entries = fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;
  for entry in entries {
    let entry = entry?;
    let path = entry.path();
    let file_type = entry.file_type()?;

    if file_type.is_symlink() && path.is_dir() {
      tracing::debug!(path = %path.display(), "skipping symlinked directory");
    } else if file_type.is_dir() {
      collect_files(&path, out)?;
    } else if path.is_file() {
      out.push(path);
    }
  }
  Ok(())
}

fn hash_file(root: &Path, path: &Path) -> ReleaseResult<FileHash> {
  let contents = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
  let mut hasher = Sha256::new();
  hasher.update(&contents);

  let relative = path.strip_prefix(root)?;
  let relative = relative
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/");

  Ok(FileHash {
    path: relative,
    sha256: format!("{:X}", hasher.finalize()),
  })
}

/// Hash every file under `root`, sorted by relative path
pub fn hash_tree(root: &Path) -> ReleaseResult<Vec<FileHash>> {
  let mut files = Vec::new();
  collect_files(root, &mut files)?;

  let mut hashes = files
    .par_iter()
    .map(|path| hash_file(root, path))
    .collect::<ReleaseResult<Vec<_>>>()?;
  hashes.sort_by(|a, b| a.path.cmp(&b.path));

  tracing::debug!(root = %root.display(), files = hashes.len(), "hashed files");
  Ok(hashes)
}

/// Markdown table of hashes
pub fn render_table(hashes: &[FileHash]) -> String {
  let mut out = String::from("# File Hashes\n\n| File | SHA256 |\n| --- | --- |\n");
  for hash in hashes {
    out.push_str(&format!("| {} | {} |\n", hash.path, hash.sha256));
  }
  out
}

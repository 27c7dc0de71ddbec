//! Put the checkout back the way the user left it

use crate::core::error::ReleaseResult;
use crate::core::vcs::Vcs;

/// Restores the branch checked out at creation when dropped
///
/// Restoring never pulls. Failures are logged; the workflow's own result is
/// what the caller sees.
pub struct BranchGuard<'a> {
  vcs: &'a dyn Vcs,
  original: Option<String>,
}

impl<'a> BranchGuard<'a> {
  pub fn new(vcs: &'a dyn Vcs) -> ReleaseResult<Self> {
    let original = vcs.current_branch()?;
    tracing::debug!(branch = %original, "remembering branch");
    Ok(Self {
      vcs,
      original: Some(original),
    })
  }

  /// Leave the checkout where the workflow put it
  pub fn disarm(mut self) {
    self.original = None;
  }
}

impl Drop for BranchGuard<'_> {
  fn drop(&mut self) {
    let Some(original) = self.original.take() else {
      return;
    };
    // Nothing to go back to on a detached HEAD
    if original == "HEAD" {
      return;
    }
    if let Err(e) = self.vcs.switch_branch(&original, true) {
      tracing::warn!(branch = %original, error = %e, "could not restore original branch");
    }
  }
}

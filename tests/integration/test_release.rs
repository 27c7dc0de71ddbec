//! Release workflow failures that must leave the checkout alone

use crate::helpers::*;
use anyhow::Result;
use tempfile::TempDir;

#[test]
fn test_release_start_outside_a_repository() -> Result<()> {
  let repo = TestRepo::new()?;
  let outside = TempDir::new()?;

  let output = run_stig_release(
    &repo,
    &["release", "start", "--repo", &outside.path().to_string_lossy()],
  )?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Not a git repository"), "stderr: {}", stderr(&output));
  Ok(())
}

#[test]
fn test_release_complete_wrong_project_keeps_branch() -> Result<()> {
  let repo = TestRepo::with_remote("https://code.example.com/Someone/Fork.git")?;
  git(&repo.path, &["checkout", "master"])?;

  let output = run_stig_release(&repo, &["release", "complete", "--pr", "7"])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("not the expected project"), "stderr: {}", stderr(&output));
  assert_eq!(repo.current_branch()?, "master");
  Ok(())
}

#[test]
fn test_status_without_credential_fails() -> Result<()> {
  let repo = TestRepo::new()?;
  let credential = repo.home().join("missing");

  let output = run_stig_release(&repo, &["status", "--credential", &credential.to_string_lossy()])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stdout(&output).is_empty());
  Ok(())
}

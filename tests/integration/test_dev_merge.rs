//! Gates that stop `dev-merge start` before anything touches the checkout

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_wrong_project_remote_is_rejected() -> Result<()> {
  let repo = TestRepo::with_remote("https://elsewhere.example.com/Other/Repo.git")?;
  repo.store_credential()?;
  let credential = repo.credential_path();

  let output = run_stig_release(
    &repo,
    &[
      "dev-merge",
      "start",
      "--kind",
      "feature",
      "--version",
      "4.2.0.0",
      "--credential",
      &credential.to_string_lossy(),
    ],
  )?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("not the expected project"), "stderr: {}", stderr(&output));
  assert!(!repo.branch_exists("4.2.0.0")?);
  Ok(())
}

#[test]
fn test_version_equal_to_published_is_rejected() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.store_credential()?;
  let credential = repo.credential_path();

  let output = run_stig_release(
    &repo,
    &[
      "dev-merge",
      "start",
      "--kind",
      "hotfix",
      "--version",
      "4.1.9.0",
      "--credential",
      &credential.to_string_lossy(),
    ],
  )?;

  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("must be greater"), "stderr: {}", stderr(&output));

  // Nothing was created or stamped
  assert!(!repo.branch_exists("4.1.9.0-Release")?);
  assert_eq!(repo.current_branch()?, "dev");
  assert_eq!(repo.read_file("PowerStig.psd1")?, MANIFEST);
  assert_eq!(repo.read_file("CHANGELOG.md")?, CHANGELOG);
  Ok(())
}

#[test]
fn test_version_published_since_last_fetch_is_rejected() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.store_credential()?;
  repo.publish_elsewhere("4.2.0.1")?;
  let credential = repo.credential_path();

  let output = run_stig_release(
    &repo,
    &[
      "dev-merge",
      "start",
      "--kind",
      "feature",
      "--version",
      "4.2.0.1",
      "--credential",
      &credential.to_string_lossy(),
    ],
  )?;

  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("published version 4.2.0.1"), "stderr: {}", stderr(&output));
  assert!(!repo.branch_exists("4.2.0.1")?);
  Ok(())
}

#[test]
fn test_version_below_published_is_rejected() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.store_credential()?;
  let credential = repo.credential_path();

  let output = run_stig_release(
    &repo,
    &[
      "dev-merge",
      "start",
      "--kind",
      "feature",
      "--version",
      "4.1.8.9",
      "--credential",
      &credential.to_string_lossy(),
    ],
  )?;

  assert_eq!(output.status.code(), Some(3));
  assert!(!repo.branch_exists("4.1.8.9")?);
  Ok(())
}

#[test]
fn test_malformed_version_is_rejected() -> Result<()> {
  let repo = TestRepo::new()?;

  let output = run_stig_release(&repo, &["dev-merge", "start", "--kind", "feature", "--version", "4.2"])?;

  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("Invalid module version '4.2'"), "stderr: {}", stderr(&output));
  Ok(())
}

#[test]
fn test_missing_credential_names_the_file() -> Result<()> {
  let repo = TestRepo::new()?;
  let credential = repo.home().join("nowhere").join("credential");

  let output = run_stig_release(
    &repo,
    &[
      "dev-merge",
      "start",
      "--kind",
      "feature",
      "--version",
      "4.2.0.0",
      "--credential",
      &credential.to_string_lossy(),
    ],
  )?;

  assert_eq!(output.status.code(), Some(1));
  assert!(
    stderr(&output).contains(&*credential.to_string_lossy()),
    "stderr: {}",
    stderr(&output)
  );
  assert!(!repo.branch_exists("4.2.0.0")?);
  assert_eq!(repo.current_branch()?, "dev");
  Ok(())
}

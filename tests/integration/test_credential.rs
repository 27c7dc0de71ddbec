//! `stig-release credential store`

use crate::helpers::*;
use anyhow::Result;
use std::io::Write;
use std::process::{Command, Stdio};

#[test]
fn test_store_writes_encrypted_file_and_key() -> Result<()> {
  let repo = TestRepo::new()?;
  let output = repo.store_credential()?;
  let path = repo.credential_path();

  assert!(stdout(&output).contains("Stored credential at"));
  assert!(path.exists());
  assert!(path.with_extension("key").exists());

  let stored = std::fs::read_to_string(&path)?;
  assert!(!stored.contains("test-token"));
  Ok(())
}

#[test]
fn test_store_json_reports_path() -> Result<()> {
  let repo = TestRepo::new()?;
  let credential = repo.credential_path();

  let output = run_stig_release(
    &repo,
    &[
      "--json",
      "credential",
      "store",
      "--token",
      "abc",
      "--credential",
      &credential.to_string_lossy(),
    ],
  )?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));

  let value: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  assert_eq!(value["credential"].as_str(), Some(&*credential.to_string_lossy()));
  Ok(())
}

#[test]
fn test_store_reads_token_from_stdin() -> Result<()> {
  let repo = TestRepo::new()?;
  let credential = repo.credential_path();

  let mut child = Command::new(env!("CARGO_BIN_EXE_stig-release"))
    .current_dir(&repo.path)
    .args(["credential", "store", "--credential", &credential.to_string_lossy()])
    .env("HOME", repo.home())
    .env_remove("STIG_RELEASE_TOKEN")
    .env_remove("STIG_RELEASE_KEY")
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()?;

  if let Some(mut stdin) = child.stdin.take() {
    stdin.write_all(b"piped-token\n")?;
  }
  let output = child.wait_with_output()?;

  assert!(output.status.success(), "stderr: {}", stderr(&output));
  assert!(credential.exists());
  Ok(())
}

#[test]
fn test_store_rejects_empty_token() -> Result<()> {
  let repo = TestRepo::new()?;
  let credential = repo.credential_path();

  let output = run_stig_release(
    &repo,
    &["credential", "store", "--token", "  ", "--credential", &credential.to_string_lossy()],
  )?;

  assert_eq!(output.status.code(), Some(1));
  assert!(!credential.exists());
  Ok(())
}

//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const REMOTE: &str = "https://code.example.com/Org/Proj.git";

pub const RELEASE_TOML: &str = r#"[project]
name = "Proj"
host = "code.example.com"
namespace = "Org"
"#;

pub const MANIFEST: &str = "@{\n    RootModule = 'PowerStig.psm1'\n    ModuleVersion = '4.1.9.0'\n    PrivateData = @{\n        PSData = @{\n            ReleaseNotes = ''\n        }\n    }\n}\n";

pub const CHANGELOG: &str = "# Change log for PowerStig\n\n## [Unreleased]\n\n* Added a rule\n\n## [4.1.9.0] - 2024-01-01\n\n* Older change\n";

/// A PowerStig-shaped checkout on `dev`, with `master` published at 4.1.9.0
///
/// The remote URL names the project, but git rewrites it (`insteadOf`) to a
/// bare repository next to the checkout, so fetch and push stay local.
pub struct TestRepo {
  root: TempDir,
  pub path: PathBuf,
}

impl TestRepo {
  pub fn new() -> Result<Self> {
    Self::with_remote(REMOTE)
  }

  pub fn with_remote(remote: &str) -> Result<Self> {
    let root = TempDir::new()?;
    let origin = root.path().join("origin.git");
    let path = root.path().join("work");
    std::fs::create_dir_all(&path)?;

    git(root.path(), &["init", "--bare", "--initial-branch=master", "origin.git"])?;
    git(&path, &["init", "--initial-branch=master"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;

    std::fs::write(path.join("release.toml"), RELEASE_TOML)?;
    std::fs::write(path.join("PowerStig.psd1"), MANIFEST)?;
    std::fs::write(path.join("CHANGELOG.md"), CHANGELOG)?;
    std::fs::write(path.join("appveyor.yml"), "version: 4.1.9.{build}\n")?;
    std::fs::write(path.join("README.md"), "# PowerStig\n\n## Contributors\n\n")?;

    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial module"])?;

    git(&path, &["remote", "add", "origin", remote])?;
    let rewrite = format!("url.{}.insteadOf", origin.display());
    git(&path, &["config", &rewrite, remote])?;
    git(&path, &["push", "--quiet", "-u", "origin", "master"])?;
    git(&path, &["checkout", "-b", "dev"])?;
    git(&path, &["push", "--quiet", "-u", "origin", "dev"])?;

    Ok(Self { root, path })
  }

  /// Publish a new manifest version on `master` from another clone, without
  /// this checkout fetching it
  pub fn publish_elsewhere(&self, version: &str) -> Result<()> {
    let other = self.root.path().join("other");
    git(self.root.path(), &["clone", "--quiet", "--branch", "master", "origin.git", "other"])?;
    git(&other, &["config", "user.name", "Other User"])?;
    git(&other, &["config", "user.email", "other@example.com"])?;
    std::fs::write(other.join("PowerStig.psd1"), MANIFEST.replace("4.1.9.0", version))?;
    git(&other, &["commit", "-am", &format!("Release {}", version)])?;
    git(&other, &["push", "--quiet", "origin", "master"])?;
    Ok(())
  }

  /// Isolated home directory for the binary
  pub fn home(&self) -> PathBuf {
    self.root.path().join("home")
  }

  /// Credential file used by these tests
  pub fn credential_path(&self) -> PathBuf {
    self.home().join("credential")
  }

  /// Store a token with the binary itself
  pub fn store_credential(&self) -> Result<Output> {
    let credential = self.credential_path();
    let output = run_stig_release(
      self,
      &[
        "credential",
        "store",
        "--token",
        "test-token",
        "--credential",
        &credential.to_string_lossy(),
      ],
    )?;
    anyhow::ensure!(output.status.success(), "credential store failed: {}", stderr(&output));
    Ok(output)
  }

  pub fn current_branch(&self) -> Result<String> {
    let output = git(&self.path, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  pub fn branch_exists(&self, name: &str) -> Result<bool> {
    let output = git(&self.path, &["branch", "--list", name])?;
    Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
  }

  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run the stig-release binary inside the repository
///
/// Unlike `git`, a non-zero exit is returned rather than turned into an
/// error; tests assert on exit codes.
pub fn run_stig_release(repo: &TestRepo, args: &[&str]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_stig-release");

  Command::new(bin)
    .current_dir(&repo.path)
    .args(args)
    .env("HOME", repo.home())
    .env_remove("USERPROFILE")
    .env_remove("STIG_RELEASE_KEY")
    .env_remove("STIG_RELEASE_TOKEN")
    .env_remove("RUST_LOG")
    .output()
    .context("Failed to run stig-release")
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}

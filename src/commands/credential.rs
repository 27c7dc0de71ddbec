//! `stig-release credential store`

use super::GlobalOptions;
use crate::core::config::ReleaseConfig;
use crate::core::error::{ReleaseResult, ResultExt};
use crate::credential::Credential;
use std::io::{self, BufRead};

/// Encrypt and store an API token
///
/// The token comes from `--token` / `STIG_RELEASE_TOKEN`, or the first line
/// of stdin.
pub fn run_credential_store(options: &GlobalOptions, token: Option<String>) -> ReleaseResult<()> {
  let token = match token {
    Some(token) => token,
    None => {
      eprintln!("Paste the API token and press Enter:");
      let mut line = String::new();
      io::stdin().lock().read_line(&mut line).context("Failed to read token from stdin")?;
      line
    }
  };

  // A config is optional here; it may only point the credential elsewhere
  let config = match &options.config {
    Some(path) => Some(ReleaseConfig::load_file(path)?),
    None => match &options.repo {
      Some(repo) => Some(ReleaseConfig::load(repo)?),
      None => None,
    },
  };

  let store = options.credential_store(config.as_ref());
  store.store(&Credential::new(token.trim()))?;

  if options.json {
    println!("{}", serde_json::json!({ "credential": store.path() }));
  } else {
    println!("🔐 Stored credential at {}", store.path().display());
  }
  Ok(())
}

//! Encrypted API credential storage
//!
//! The token lives on disk as base64 of `nonce || ciphertext || tag`
//! (AES-256-GCM). The key comes from `STIG_RELEASE_KEY` (64 hex chars) or a
//! key file next to the credential, created on first `store`.
//!
//! The loaded `Credential` is handed explicitly to the API client; there is
//! no process-wide token.

use crate::core::error::{CredentialError, ReleaseError, ReleaseResult, ResultExt};
use aes_gcm::Aes256Gcm;
use aes_gcm::aead::{Aead, KeyInit};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding a hex-encoded 256-bit key
pub const KEY_ENV: &str = "STIG_RELEASE_KEY";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// An API token; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
  token: String,
  source: PathBuf,
}

impl Credential {
  pub fn new(token: impl Into<String>) -> Self {
    Self {
      token: token.into(),
      source: PathBuf::new(),
    }
  }

  /// Record the file this token was read from
  pub fn from_file(token: impl Into<String>, source: &Path) -> Self {
    Self {
      token: token.into(),
      source: source.to_path_buf(),
    }
  }

  pub fn expose(&self) -> &str {
    &self.token
  }

  /// File the token came from (empty when built in memory)
  pub fn source(&self) -> &Path {
    &self.source
  }

  pub fn is_empty(&self) -> bool {
    self.token.trim().is_empty()
  }
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Credential([REDACTED])")
  }
}

/// Default credential location under the user profile
pub fn default_credential_path() -> PathBuf {
  let home = std::env::var_os("HOME")
    .or_else(|| std::env::var_os("USERPROFILE"))
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("."));
  home.join(".config").join("stig-release").join("credential")
}

/// Key file used when `STIG_RELEASE_KEY` is not set
pub fn key_path_for(credential_path: &Path) -> PathBuf {
  credential_path.with_extension("key")
}

/// Where the encrypted credential and its key live
#[derive(Debug, Clone)]
pub struct CredentialStore {
  path: PathBuf,
  key_path: PathBuf,
}

impl CredentialStore {
  pub fn new(path: PathBuf) -> Self {
    let key_path = key_path_for(&path);
    Self { path, key_path }
  }

  /// Store at `path`, or the default location
  pub fn at(path: Option<&Path>) -> Self {
    Self::new(path.map(Path::to_path_buf).unwrap_or_else(default_credential_path))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load and decrypt the credential
  pub fn load(&self) -> ReleaseResult<Credential> {
    if !self.path.exists() {
      return Err(CredentialError::Missing { path: self.path.clone() }.into());
    }

    let encoded = fs::read_to_string(&self.path)
      .with_context(|| format!("Failed to read credential from {}", self.path.display()))?;
    let encoded = encoded.trim();
    if encoded.is_empty() {
      return Err(CredentialError::Missing { path: self.path.clone() }.into());
    }

    let key = self.read_key()?;
    let corrupt = |reason: &str| {
      ReleaseError::Credential(CredentialError::Corrupt {
        path: self.path.clone(),
        reason: reason.to_string(),
      })
    };

    let bytes = STANDARD.decode(encoded).map_err(|_| corrupt("not valid base64"))?;
    if bytes.len() < NONCE_LEN + TAG_LEN {
      return Err(corrupt("too short"));
    }

    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| corrupt("bad key length"))?;
    let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
    let plaintext = cipher
      .decrypt(nonce.into(), ciphertext)
      .map_err(|_| corrupt("decryption failed"))?;
    let token = String::from_utf8(plaintext).map_err(|_| corrupt("token is not UTF-8"))?;

    let credential = Credential::from_file(token, &self.path);
    if credential.is_empty() {
      return Err(CredentialError::Missing { path: self.path.clone() }.into());
    }

    tracing::debug!(path = %self.path.display(), "loaded credential");
    Ok(credential)
  }

  /// Encrypt and persist a token, creating a key file if no key exists
  pub fn store(&self, credential: &Credential) -> ReleaseResult<()> {
    if credential.is_empty() {
      return Err(ReleaseError::with_help(
        "Refusing to store an empty token",
        "Pass the token on stdin or with --token",
      ));
    }

    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let key = match self.read_key() {
      Ok(key) => key,
      Err(ReleaseError::Credential(CredentialError::KeyMissing { .. })) => self.create_key_file()?,
      Err(e) => return Err(e),
    };

    let cipher = Aes256Gcm::new_from_slice(&key)
      .map_err(|_| ReleaseError::message("Credential key must be 32 bytes"))?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
      .encrypt((&nonce).into(), credential.expose().as_bytes())
      .map_err(|_| ReleaseError::message("Failed to encrypt credential"))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);

    write_private(&self.path, STANDARD.encode(out).as_bytes())?;
    tracing::info!(path = %self.path.display(), "stored credential");
    Ok(())
  }

  fn read_key(&self) -> ReleaseResult<Vec<u8>> {
    let (source, hex_key) = match std::env::var(KEY_ENV) {
      Ok(value) if !value.trim().is_empty() => (PathBuf::from(KEY_ENV), value),
      _ => {
        if !self.key_path.exists() {
          return Err(CredentialError::KeyMissing {
            path: self.key_path.clone(),
          }
          .into());
        }
        let value = fs::read_to_string(&self.key_path)
          .with_context(|| format!("Failed to read key from {}", self.key_path.display()))?;
        (self.key_path.clone(), value)
      }
    };

    let key = hex::decode(hex_key.trim()).map_err(|_| CredentialError::Corrupt {
      path: source.clone(),
      reason: "key is not hex".to_string(),
    })?;
    if key.len() != 32 {
      return Err(
        CredentialError::Corrupt {
          path: source,
          reason: format!("key is {} bytes, expected 32", key.len()),
        }
        .into(),
      );
    }
    Ok(key)
  }

  fn create_key_file(&self) -> ReleaseResult<Vec<u8>> {
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    write_private(&self.key_path, hex::encode(key).as_bytes())?;
    tracing::info!(path = %self.key_path.display(), "created credential key");
    Ok(key.to_vec())
  }
}

/// Write a file readable only by the owner
fn write_private(path: &Path, contents: &[u8]) -> ReleaseResult<()> {
  fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;

  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
      .with_context(|| format!("Failed to restrict permissions on {}", path.display()))?;
  }

  Ok(())
}

//! Core building blocks shared by every workflow
//!
//! - **config**: `release.toml` parsing, defaults and validation
//! - **context**: Repository identity derived from the git remote
//! - **error**: Error taxonomy with contextual help messages and exit codes
//! - **vcs**: Git operations abstraction (`Vcs` trait, `SystemGit`)
//! - **version**: Four-component module versions and the release gate

pub mod config;
pub mod context;
pub mod error;
pub mod vcs;
pub mod version;

//! Release workflow: promote the development line to stable and publish

use super::{BranchGuard, Orchestrator, Outcome, ReleaseBranch};
use crate::artifacts::manifest;
use crate::core::error::{ReleaseError, ReleaseResult};
use crate::core::version::ModuleVersion;
use crate::github::{self, NewPullRequest, NewRelease, RefState, get_ref_status};

impl Orchestrator<'_> {
  /// Version and notes from the development line's manifest
  pub(crate) fn development_release(&self) -> ReleaseResult<(ModuleVersion, String)> {
    let branches = &self.config.branches;
    let artifacts = self.artifacts();
    let remote_ref = format!("{}/{}", branches.remote, branches.development);
    if let Err(e) = self.refresh(&remote_ref) {
      tracing::warn!(reference = %remote_ref, error = %e, "fetch failed, reading the last fetched state");
    }

    let text = match self.vcs.read_file_at_ref(&remote_ref, artifacts.manifest_relative())? {
      Some(text) => text,
      None => self
        .vcs
        .read_file_at_ref(&branches.development, artifacts.manifest_relative())?
        .ok_or_else(|| {
          ReleaseError::message(format!(
            "No manifest at {} on {}",
            artifacts.manifest_relative().display(),
            branches.development
          ))
        })?,
    };

    let version = manifest::read_version(&text)?
      .ok_or_else(|| ReleaseError::message(format!("No ModuleVersion in the {} manifest", branches.development)))?;
    let notes = manifest::read_release_notes(&text)?.unwrap_or_default();
    Ok((version, notes))
  }

  /// Open (or reuse) the development → stable pull request once CI on the
  /// development line is green
  pub fn release_start(&self, wait: bool) -> ReleaseResult<Outcome> {
    let ctx = self.resolve_context()?;
    let host = self.connector.connect(&ctx)?;
    let branches = &self.config.branches;

    let state = get_ref_status(
      host.as_ref(),
      &ctx,
      &branches.development,
      wait,
      &self.poll_policy(),
      self.sleeper,
    )?;
    if state != RefState::Success {
      return Err(ReleaseError::NotMergeable {
        branch: branches.development.clone(),
        state,
      });
    }

    let (version, notes) = self.development_release()?;
    tracing::info!(%version, "starting release");

    let pr = match github::find_pull_request(host.as_ref(), &ctx, &branches.development, &branches.stable)? {
      Some(pr) => {
        tracing::info!(number = pr.number, "reusing open release pull request");
        pr
      }
      None => host.create_pull_request(
        &ctx,
        &NewPullRequest {
          title: format!("Release {}", version),
          head: branches.development.clone(),
          base: branches.stable.clone(),
          body: notes,
        },
      )?,
    };

    Ok(Outcome {
      pull_request: Some(pr.number),
      version: Some(version),
      ..Outcome::default()
    })
  }

  /// Merge the release pull request, publish the tagged release and remove
  /// the staging branch
  pub fn release_complete(&self, number: u64) -> ReleaseResult<Outcome> {
    let ctx = self.resolve_context()?;
    let branches = &self.config.branches;

    let _guard = BranchGuard::new(self.vcs)?;
    self.vcs.switch_branch(&branches.development, false)?;

    let host = self.connector.connect(&ctx)?;
    let pr = host.get_pull_request(&ctx, number)?;
    if pr.merged {
      tracing::info!(number, "pull request already merged");
    } else {
      host.merge_pull_request(&ctx, number, &self.merge_request())?;
    }

    let (version, notes) = self.artifacts().manifest_release()?;
    let tag = format!("{}{}", version, self.config.release.tag_suffix);

    let release = match host.find_release_by_tag(&ctx, &tag)? {
      Some(release) => {
        tracing::info!(tag = %tag, "release already published");
        release
      }
      None => host.create_release(
        &ctx,
        &NewRelease {
          tag_name: tag.clone(),
          target_commitish: branches.stable.clone(),
          name: format!("Release {}", version),
          body: notes,
          draft: false,
          prerelease: false,
        },
      )?,
    };

    for leftover in ReleaseBranch::for_version(&version, branches) {
      if self.vcs.branch_exists(&leftover.name)? || self.vcs.remote_branch_exists(&leftover.name)? {
        self.vcs.delete_branch(&leftover.name)?;
      } else {
        tracing::debug!(branch = %leftover.name, kind = %leftover.kind, "no release branch to delete");
      }
    }

    tracing::info!(tag = %tag, url = %release.html_url, "release published");
    Ok(Outcome {
      pull_request: Some(number),
      version: Some(version),
      release_tag: Some(tag),
      release_url: Some(release.html_url),
      ..Outcome::default()
    })
  }
}

#[cfg(test)]
mod tests {
  use super::super::MERGE_COMMIT_TITLE;
  use super::super::testing::*;
  use super::*;
  use crate::github::poll::tests::FakeSleeper;
  use std::fs;
  use std::time::Duration;

  const DEV_MANIFEST: &str = "@{\n    ModuleVersion = '4.2.0.1'\n    ReleaseNotes = '* Added a rule'\n}\n";

  fn dev_vcs() -> FakeVcs {
    let vcs = FakeVcs::new();
    vcs
      .refs
      .borrow_mut()
      .insert("origin/dev".to_string(), DEV_MANIFEST.to_string());
    fs::write(vcs.root.path().join("PowerStig.psd1"), DEV_MANIFEST).unwrap();
    vcs
  }

  #[test]
  fn test_start_on_pending_is_not_mergeable() {
    let vcs = dev_vcs();
    let host = FakeHost::with_states(&[RefState::Pending]);
    let connector = FakeConnector::new(&host);
    let sleeper = FakeSleeper::default();
    let config = config();
    let orchestrator = Orchestrator::new(&config, &vcs, &connector, &sleeper);

    let err = orchestrator.release_start(false).unwrap_err();
    match &err {
      ReleaseError::NotMergeable { branch, state } => {
        assert_eq!(branch, "dev");
        assert_eq!(*state, RefState::Pending);
      }
      other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().contains("pending"));
    assert!(host.created_pulls.borrow().is_empty());
  }

  #[test]
  fn test_start_on_failure_is_not_mergeable() {
    let vcs = dev_vcs();
    let host = FakeHost::with_states(&[RefState::Failure]);
    let connector = FakeConnector::new(&host);
    let sleeper = FakeSleeper::default();
    let config = config();
    let orchestrator = Orchestrator::new(&config, &vcs, &connector, &sleeper);

    assert!(matches!(
      orchestrator.release_start(true),
      Err(ReleaseError::NotMergeable {
        state: RefState::Failure,
        ..
      })
    ));
  }

  #[test]
  fn test_start_waits_then_opens_release_pull_request() {
    let vcs = dev_vcs();
    let host = FakeHost::with_states(&[RefState::Pending, RefState::Success]);
    let connector = FakeConnector::new(&host);
    let sleeper = FakeSleeper::default();
    let config = config();
    let orchestrator = Orchestrator::new(&config, &vcs, &connector, &sleeper);

    let outcome = orchestrator.release_start(true).unwrap();
    assert_eq!(outcome.pull_request, Some(42));
    assert_eq!(*sleeper.sleeps.borrow(), vec![Duration::from_secs(30)]);

    let created = host.created_pulls.borrow();
    assert_eq!(created[0].title, "Release 4.2.0.1");
    assert_eq!(created[0].head, "dev");
    assert_eq!(created[0].base, "master");
    assert_eq!(created[0].body, "* Added a rule");
  }

  #[test]
  fn test_start_reuses_open_release_pull_request() {
    let vcs = dev_vcs();
    let host = FakeHost::default();
    host.add_pull(pull(9, "dev", "master"));
    let connector = FakeConnector::new(&host);
    let sleeper = FakeSleeper::default();
    let config = config();
    let orchestrator = Orchestrator::new(&config, &vcs, &connector, &sleeper);

    assert_eq!(orchestrator.release_start(false).unwrap().pull_request, Some(9));
    assert!(host.created_pulls.borrow().is_empty());
  }

  #[test]
  fn test_complete_publishes_and_deletes_staging_branch() {
    let vcs = dev_vcs();
    vcs.branches.borrow_mut().insert("4.2.0.1-Release".into());
    *vcs.current.borrow_mut() = "master".into();
    let host = FakeHost::default();
    host.add_pull(pull(9, "dev", "master"));
    let connector = FakeConnector::new(&host);
    let sleeper = FakeSleeper::default();
    let config = config();
    let orchestrator = Orchestrator::new(&config, &vcs, &connector, &sleeper);

    let outcome = orchestrator.release_complete(9).unwrap();
    assert_eq!(outcome.release_tag.as_deref(), Some("4.2.0.1-PSGallery"));

    assert_eq!(host.merges.borrow().len(), 1);
    assert_eq!(host.merges.borrow()[0].title, MERGE_COMMIT_TITLE);
    let releases = host.created_releases.borrow();
    assert_eq!(releases[0].tag_name, "4.2.0.1-PSGallery");
    assert_eq!(releases[0].target_commitish, "master");
    assert_eq!(releases[0].body, "* Added a rule");

    assert!(vcs.called("switch_branch dev skip_pull=false"));
    assert!(vcs.called("delete_branch 4.2.0.1-Release"));
    // Back where we started, without a pull
    assert_eq!(vcs.current.borrow().as_str(), "master");
    assert_eq!(
      vcs.calls.borrow().last().map(String::as_str),
      Some("switch_branch master skip_pull=true")
    );
  }

  #[test]
  fn test_complete_deletes_feature_branch() {
    let vcs = dev_vcs();
    vcs.branches.borrow_mut().insert("4.2.0.1".into());
    vcs.remote_branches.borrow_mut().insert("4.2.0.1".into());
    let host = FakeHost::default();
    host.add_pull(pull(9, "dev", "master"));
    let connector = FakeConnector::new(&host);
    let sleeper = FakeSleeper::default();
    let config = config();
    let orchestrator = Orchestrator::new(&config, &vcs, &connector, &sleeper);

    orchestrator.release_complete(9).unwrap();

    assert!(vcs.called("delete_branch 4.2.0.1"));
    assert!(!vcs.branches.borrow().contains("4.2.0.1"));
    assert!(!vcs.remote_branches.borrow().contains("4.2.0.1"));
    assert!(!vcs.called("delete_branch 4.2.0.1-Release"));
  }

  #[test]
  fn test_complete_deletes_branch_left_only_on_remote() {
    let vcs = dev_vcs();
    vcs.remote_branches.borrow_mut().insert("4.2.0.1-Release".into());
    let host = FakeHost::default();
    host.add_pull(pull(9, "dev", "master"));
    let connector = FakeConnector::new(&host);
    let sleeper = FakeSleeper::default();
    let config = config();
    let orchestrator = Orchestrator::new(&config, &vcs, &connector, &sleeper);

    orchestrator.release_complete(9).unwrap();

    assert!(vcs.called("delete_branch 4.2.0.1-Release"));
    assert!(!vcs.remote_branches.borrow().contains("4.2.0.1-Release"));
  }

  #[test]
  fn test_complete_rerun_skips_merge_and_existing_release() {
    let vcs = dev_vcs();
    let host = FakeHost::default();
    let mut merged = pull(9, "dev", "master");
    merged.merged = true;
    host.add_pull(merged);
    let connector = FakeConnector::new(&host);
    let sleeper = FakeSleeper::default();
    let config = config();
    let orchestrator = Orchestrator::new(&config, &vcs, &connector, &sleeper);

    orchestrator.release_complete(9).unwrap();
    orchestrator.release_complete(9).unwrap();

    assert!(host.merges.borrow().is_empty());
    assert_eq!(host.created_releases.borrow().len(), 1);
    assert!(!vcs.called("delete_branch"));
  }
}

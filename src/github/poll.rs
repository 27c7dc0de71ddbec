//! Bounded polling of a ref's CI status

use super::{CodeHost, RefState};
use crate::core::config::PollingConfig;
use crate::core::context::RepositoryContext;
use crate::core::error::{ReleaseError, ReleaseResult};
use std::time::Duration;

/// Something that can wait; tests swap in a fake clock
pub trait Sleeper {
  fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeping
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
  fn sleep(&self, duration: Duration) {
    std::thread::sleep(duration);
  }
}

/// Interval and number of pending observations tolerated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
  pub interval: Duration,
  pub max_attempts: u32,
}

impl Default for PollPolicy {
  /// 30 checks, 30 seconds apart: a 15 minute ceiling
  fn default() -> Self {
    Self {
      interval: Duration::from_secs(30),
      max_attempts: 30,
    }
  }
}

impl From<&PollingConfig> for PollPolicy {
  fn from(config: &PollingConfig) -> Self {
    Self {
      interval: config.interval(),
      max_attempts: config.max_attempts,
    }
  }
}

/// Status of `reference`
///
/// Without `wait` the first observation is returned as is, `pending`
/// included. With `wait`, a pending status is re-checked after each interval
/// until it settles; once `max_attempts` pending observations have been made
/// (each followed by a sleep) the poll gives up with `ApiTimeout`.
pub fn get_ref_status<H: CodeHost + ?Sized>(
  host: &H,
  ctx: &RepositoryContext,
  reference: &str,
  wait: bool,
  policy: &PollPolicy,
  sleeper: &dyn Sleeper,
) -> ReleaseResult<RefState> {
  let mut attempts = 0u32;
  let mut elapsed = Duration::ZERO;

  loop {
    let state = host.ref_state(ctx, reference)?;
    if !wait || state != RefState::Pending {
      return Ok(state);
    }

    attempts += 1;
    tracing::info!(
      reference,
      attempt = attempts,
      max = policy.max_attempts,
      "status pending, waiting {}s",
      policy.interval.as_secs()
    );
    sleeper.sleep(policy.interval);
    elapsed += policy.interval;

    if attempts >= policy.max_attempts {
      return Err(ReleaseError::ApiTimeout {
        reference: reference.to_string(),
        attempts,
        elapsed,
      });
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::github::{MergeRequest, NewPullRequest, NewRelease, PullRequest, Release, UserProfile};
  use std::cell::{Cell, RefCell};

  /// Records requested sleeps instead of sleeping
  #[derive(Default)]
  pub(crate) struct FakeSleeper {
    pub(crate) sleeps: RefCell<Vec<Duration>>,
  }

  impl Sleeper for FakeSleeper {
    fn sleep(&self, duration: Duration) {
      self.sleeps.borrow_mut().push(duration);
    }
  }

  /// Answers ref_state from a script, repeating the last entry
  struct ScriptedStatus {
    script: Vec<RefState>,
    calls: Cell<usize>,
  }

  impl ScriptedStatus {
    fn new(script: Vec<RefState>) -> Self {
      Self {
        script,
        calls: Cell::new(0),
      }
    }
  }

  impl CodeHost for ScriptedStatus {
    fn list_closed_pull_requests(&self, _: &RepositoryContext, _: &str, _: u32) -> ReleaseResult<Vec<PullRequest>> {
      unimplemented!()
    }
    fn list_open_pull_requests(&self, _: &RepositoryContext, _: &str, _: u32) -> ReleaseResult<Vec<PullRequest>> {
      unimplemented!()
    }
    fn get_user(&self, _: &RepositoryContext, _: &str) -> ReleaseResult<UserProfile> {
      unimplemented!()
    }
    fn create_pull_request(&self, _: &RepositoryContext, _: &NewPullRequest) -> ReleaseResult<PullRequest> {
      unimplemented!()
    }
    fn get_pull_request(&self, _: &RepositoryContext, _: u64) -> ReleaseResult<PullRequest> {
      unimplemented!()
    }
    fn merge_pull_request(&self, _: &RepositoryContext, _: u64, _: &MergeRequest) -> ReleaseResult<PullRequest> {
      unimplemented!()
    }
    fn ref_state(&self, _: &RepositoryContext, _: &str) -> ReleaseResult<RefState> {
      let n = self.calls.get();
      self.calls.set(n + 1);
      Ok(*self.script.get(n).or(self.script.last()).unwrap())
    }
    fn create_release(&self, _: &RepositoryContext, _: &NewRelease) -> ReleaseResult<Release> {
      unimplemented!()
    }
    fn find_release_by_tag(&self, _: &RepositoryContext, _: &str) -> ReleaseResult<Option<Release>> {
      unimplemented!()
    }
  }

  fn ctx() -> RepositoryContext {
    RepositoryContext {
      name: "Proj".into(),
      web_url: "https://code.example.com/Org/Proj".into(),
      api_base_url: "https://api.code.example.com/repos/Org/Proj".into(),
    }
  }

  #[test]
  fn test_no_wait_returns_pending_immediately() {
    let host = ScriptedStatus::new(vec![RefState::Pending]);
    let sleeper = FakeSleeper::default();
    let state = get_ref_status(&host, &ctx(), "dev", false, &PollPolicy::default(), &sleeper).unwrap();
    assert_eq!(state, RefState::Pending);
    assert_eq!(host.calls.get(), 1);
    assert!(sleeper.sleeps.borrow().is_empty());
  }

  #[test]
  fn test_wait_returns_settled_state_without_sleeping() {
    for settled in [RefState::Success, RefState::Failure] {
      let host = ScriptedStatus::new(vec![settled]);
      let sleeper = FakeSleeper::default();
      let state = get_ref_status(&host, &ctx(), "dev", true, &PollPolicy::default(), &sleeper).unwrap();
      assert_eq!(state, settled);
      assert!(sleeper.sleeps.borrow().is_empty());
    }
  }

  #[test]
  fn test_wait_retries_until_success() {
    let host = ScriptedStatus::new(vec![RefState::Pending, RefState::Pending, RefState::Success]);
    let sleeper = FakeSleeper::default();
    let state = get_ref_status(&host, &ctx(), "dev", true, &PollPolicy::default(), &sleeper).unwrap();
    assert_eq!(state, RefState::Success);
    assert_eq!(host.calls.get(), 3);
    assert_eq!(*sleeper.sleeps.borrow(), vec![Duration::from_secs(30); 2]);
  }

  #[test]
  fn test_always_pending_times_out_after_thirty_observations() {
    let host = ScriptedStatus::new(vec![RefState::Pending]);
    let sleeper = FakeSleeper::default();
    let err = get_ref_status(&host, &ctx(), "dev", true, &PollPolicy::default(), &sleeper).unwrap_err();

    assert_eq!(host.calls.get(), 30);
    assert_eq!(sleeper.sleeps.borrow().len(), 30);
    match err {
      ReleaseError::ApiTimeout {
        reference,
        attempts,
        elapsed,
      } => {
        assert_eq!(reference, "dev");
        assert_eq!(attempts, 30);
        assert_eq!(elapsed, Duration::from_secs(15 * 60));
      }
      other => panic!("unexpected error: {:?}", other),
    }
  }
}

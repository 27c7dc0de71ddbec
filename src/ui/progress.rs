//! Progress indicator for CI polling
//!
//! Uses `linya` for a single lightweight bar on stderr.

use crate::github::{PollPolicy, Sleeper};
use linya::{Bar, Progress};
use std::cell::RefCell;
use std::time::Duration;

/// Sleeper that advances a bar by one step per poll interval
pub struct PollProgress<S: Sleeper> {
  inner: S,
  progress: RefCell<Progress>,
  bar: Bar,
}

impl<S: Sleeper> PollProgress<S> {
  /// Bar with one step per tolerated pending observation
  pub fn new(inner: S, policy: &PollPolicy, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(policy.max_attempts as usize, label.into());
    Self {
      inner,
      progress: RefCell::new(progress),
      bar,
    }
  }
}

impl<S: Sleeper> Sleeper for PollProgress<S> {
  fn sleep(&self, duration: Duration) {
    self.inner.sleep(duration);
    self.progress.borrow_mut().inc_and_draw(&self.bar, 1);
  }
}

//! Integration tests driving the stig-release binary against real git
//! repositories

mod helpers;
mod test_credential;
mod test_dev_merge;
mod test_release;

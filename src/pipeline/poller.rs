//! Build trigger and status poller
//!
//! ```text
//! submitted ──GET status──▶ polling ──"build_succeeded"──▶ done
//!                             │  ▲
//!                             └──┘ sleep(interval)
//! ```
//!
//! Only the exact state `build_succeeded` ends the loop. Any other value,
//! including a missing `build_state`, keeps polling. The two exits beyond
//! that are opt-in through [`PollPolicy`]: known failure states become
//! [`WheelforgeError::BuildFailed`] and `max_wait` bounds the total wait:
//! the loop gives up instead of starting a sleep that would pass it.

use std::time::Duration;

use anyhow::Result;

use super::service::BuildService;
use crate::config::{PollPolicy, MIN_POLL_INTERVAL};
use crate::error::WheelforgeError;
use crate::utils::terminal;

/// Terminal success state reported by the build service
pub const SUCCEEDED_STATE: &str = "build_succeeded";

/// States treated as failure when `fail_on_error` is set
pub const FAILURE_STATES: &[&str] = &["build_failed", "build_failure", "failed"];

/// Blocks the pipeline between status requests
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Submits a build and waits for it to finish
pub struct BuildPoller<'a, S: BuildService, Z: Sleeper> {
    service: &'a S,
    sleeper: &'a Z,
    policy: &'a PollPolicy,
}

impl<'a, S: BuildService, Z: Sleeper> BuildPoller<'a, S, Z> {
    pub fn new(service: &'a S, sleeper: &'a Z, policy: &'a PollPolicy) -> Self {
        Self {
            service,
            sleeper,
            policy,
        }
    }

    /// Sleep between polls, never shorter than [`MIN_POLL_INTERVAL`]
    pub fn interval(&self) -> Duration {
        self.policy.interval.max(MIN_POLL_INTERVAL)
    }

    /// Submit the recipe and return the build plan id
    pub fn submit(&self, recipe_id: &str) -> Result<String> {
        terminal::print_step("Generating wheels...");
        let response = self.service.submit_build(recipe_id)?;
        response
            .build_plan_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| WheelforgeError::malformed("build submission", "build_plan_id").into())
    }

    /// Poll until the plan reports success; returns the number of status requests
    pub fn wait(&self, plan_id: &str) -> Result<u32> {
        let interval = self.interval();
        let spinner = terminal::create_spinner("Waiting for wheels to build...");
        let mut waited = Duration::ZERO;
        let mut polls = 0u32;

        let outcome = loop {
            let status = match self.service.build_status(plan_id) {
                Ok(status) => status,
                Err(e) => break Err(e),
            };
            polls += 1;

            match status.build_state.as_deref() {
                Some(SUCCEEDED_STATE) => break Ok(polls),
                Some(state) if self.policy.fail_on_error && FAILURE_STATES.contains(&state) => {
                    break Err(WheelforgeError::BuildFailed {
                        plan_id: plan_id.to_string(),
                        state: state.to_string(),
                    }
                    .into());
                }
                state => spinner.set_message(format!(
                    "Waiting for wheels to build... ({})",
                    state.unwrap_or("unknown")
                )),
            }

            if let Some(max_wait) = self.policy.max_wait {
                if waited + interval > max_wait {
                    break Err(WheelforgeError::PollTimeout {
                        plan_id: plan_id.to_string(),
                        waited_secs: waited.as_secs(),
                    }
                    .into());
                }
            }

            self.sleeper.sleep(interval);
            waited += interval;
        };

        spinner.finish_and_clear();
        outcome
    }

    /// Submit and wait; returns the build plan id
    pub fn run(&self, recipe_id: &str) -> Result<String> {
        let plan_id = self.submit(recipe_id)?;
        let polls = self.wait(&plan_id)?;
        terminal::print_success(&format!("Build {} succeeded after {} status check(s)", plan_id, polls));
        Ok(plan_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::service::testing::FakeService;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: RefCell<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }
    }

    #[test]
    fn test_polls_until_succeeded() {
        let service = FakeService::new().with_states(&[
            Some("planning"),
            None,
            Some("building"),
            Some("build_succeeded"),
        ]);
        let sleeper = RecordingSleeper::default();
        let policy = PollPolicy::default();
        let poller = BuildPoller::new(&service, &sleeper, &policy);

        let plan_id = poller.run("recipe-1").unwrap();

        assert_eq!(plan_id, "plan-1");
        assert_eq!(*service.submitted.borrow(), vec!["recipe-1"]);
        assert_eq!(service.status_calls.borrow().len(), 4);
        assert!(service.status_calls.borrow().iter().all(|p| p == "plan-1"));
        let sleeps = sleeper.sleeps.borrow();
        assert_eq!(sleeps.len(), 3);
        assert!(sleeps.iter().all(|d| *d >= Duration::from_secs(5)));
    }

    #[test]
    fn test_succeeds_on_first_poll_without_sleeping() {
        let service = FakeService::new().with_states(&[Some("build_succeeded")]);
        let sleeper = RecordingSleeper::default();
        let policy = PollPolicy::default();
        let poller = BuildPoller::new(&service, &sleeper, &policy);

        assert_eq!(poller.wait("plan-1").unwrap(), 1);
        assert!(sleeper.sleeps.borrow().is_empty());
    }

    #[test]
    fn test_failure_state_keeps_polling_by_default() {
        let service = FakeService::new().with_states(&[
            Some("build_failed"),
            Some("BUILD_SUCCEEDED"),
            Some("build_succeeded "),
            Some("build_succeeded"),
        ]);
        let sleeper = RecordingSleeper::default();
        let policy = PollPolicy::default();
        let poller = BuildPoller::new(&service, &sleeper, &policy);

        assert_eq!(poller.wait("plan-1").unwrap(), 4);
    }

    #[test]
    fn test_failure_state_is_terminal_when_enabled() {
        let service = FakeService::new().with_states(&[Some("building"), Some("build_failed")]);
        let sleeper = RecordingSleeper::default();
        let policy = PollPolicy {
            fail_on_error: true,
            ..PollPolicy::default()
        };
        let poller = BuildPoller::new(&service, &sleeper, &policy);

        let err = poller.wait("plan-1").unwrap_err();
        match err.downcast_ref::<WheelforgeError>() {
            Some(WheelforgeError::BuildFailed { plan_id, state }) => {
                assert_eq!(plan_id, "plan-1");
                assert_eq!(state, "build_failed");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_max_wait_times_out() {
        let service = FakeService::new().with_states(&[Some("building"); 10]);
        let sleeper = RecordingSleeper::default();
        let policy = PollPolicy {
            max_wait: Some(Duration::from_secs(10)),
            ..PollPolicy::default()
        };
        let poller = BuildPoller::new(&service, &sleeper, &policy);

        let err = poller.wait("plan-1").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WheelforgeError>(),
            Some(WheelforgeError::PollTimeout { waited_secs: 10, .. })
        ));
        assert_eq!(sleeper.sleeps.borrow().len(), 2);
        assert_eq!(service.status_calls.borrow().len(), 3);
    }

    #[test]
    fn test_max_wait_is_never_overrun() {
        let service = FakeService::new().with_states(&[Some("building"); 10]);
        let sleeper = RecordingSleeper::default();
        let policy = PollPolicy {
            max_wait: Some(Duration::from_secs(7)),
            ..PollPolicy::default()
        };
        let poller = BuildPoller::new(&service, &sleeper, &policy);

        let err = poller.wait("plan-1").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WheelforgeError>(),
            Some(WheelforgeError::PollTimeout { waited_secs: 5, .. })
        ));
        let total: Duration = sleeper.sleeps.borrow().iter().sum();
        assert!(total <= Duration::from_secs(7));
        assert_eq!(service.status_calls.borrow().len(), 2);
    }

    #[test]
    fn test_interval_is_clamped() {
        let service = FakeService::new();
        let sleeper = RecordingSleeper::default();
        let policy = PollPolicy {
            interval: Duration::from_secs(1),
            ..PollPolicy::default()
        };
        let poller = BuildPoller::new(&service, &sleeper, &policy);
        assert_eq!(poller.interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_submit_without_plan_id() {
        let service = FakeService {
            plan_id: None,
            ..FakeService::default()
        };
        let sleeper = RecordingSleeper::default();
        let policy = PollPolicy::default();
        let poller = BuildPoller::new(&service, &sleeper, &policy);

        let err = poller.submit("recipe-1").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WheelforgeError>(),
            Some(WheelforgeError::MalformedResponse { .. })
        ));
    }
}

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::RelayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_polls: u32,
}

impl PollPolicy {
    /// Longest time spent sleeping between status checks.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_polls
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_polls: 20,
        }
    }
}

pub trait Pollable {
    fn is_done(&self) -> bool;
}

/// Sleeps `policy.interval`, re-fetches, and repeats until the state reports
/// done, `policy.max_polls` fetches have happened, or `cancel` fires.
///
/// The whole loop, fetches included, finishes within `policy.budget()`.
pub async fn poll_until_done<T, F, Fut>(
    policy: PollPolicy,
    cancel: &CancellationToken,
    initial: T,
    mut fetch: F,
) -> Result<T, RelayError>
where
    T: Pollable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RelayError>>,
{
    let deadline = Instant::now() + policy.budget();
    let mut current = initial;
    let mut polls = 0u32;

    while !current.is_done() {
        if polls >= policy.max_polls {
            return Err(RelayError::PollTimeout { polls });
        }

        let wake = (Instant::now() + policy.interval).min(deadline);
        tokio::select! {
            _ = cancel.cancelled() => return Err(RelayError::Cancelled),
            _ = sleep_until(wake) => {}
        }

        current = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RelayError::Cancelled),
            next = fetch() => next?,
            _ = sleep_until(deadline) => {
                debug!(polls, "Poll budget spent while fetching");
                return Err(RelayError::PollTimeout { polls });
            }
        };
        polls += 1;
        debug!(polls, max_polls = policy.max_polls, done = current.is_done(), "Polled operation");
    }

    Ok(current)
}

//! Bounded waits for elements to appear

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::browser::element::{BrowserSession, Element};
use crate::browser::locator::By;
use crate::core::{Result, SeiError};

/// How long to wait and how often to look
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll: Duration,
}

impl WaitPolicy {
    pub fn new(timeout: Duration, poll: Duration) -> Self {
        Self { timeout, poll }
    }

    /// Look exactly once
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::from_millis(1))
    }
}

/// Poll the current context until `by` matches or the timeout elapses.
///
/// Lookup errors other than an unsupported locator are treated as "not yet
/// present" so that a page mid-reload does not end the wait early.
pub async fn wait_for_element(
    session: &dyn BrowserSession,
    by: &By,
    policy: WaitPolicy,
) -> Result<Element> {
    let started = Instant::now();
    let deadline = started + policy.timeout;

    loop {
        match session.find_elements(by).await {
            Ok(found) => {
                if let Some(element) = found.into_iter().next() {
                    return Ok(element);
                }
            }
            Err(e @ SeiError::Unsupported(_)) => return Err(e),
            Err(e) => debug!(locator = %by, error = %e, "Lookup failed while waiting"),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(SeiError::ElementWaitTimeout {
                locator: by.to_string(),
                timeout_ms: policy.timeout.as_millis(),
            });
        }

        tokio::time::sleep(policy.poll.min(deadline - now)).await;
    }
}

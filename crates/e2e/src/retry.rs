//! Bounded retry with constant backoff
//!
//! The live site changes asynchronously (page loads, AJAX updates) and the
//! only way to observe progress is to ask again. [`retry`] is the single
//! polling loop used for element checks, page navigation and login.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;

/// How many times to try and how long to wait between tries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, delay_ms: u64) -> Self {
        Self { attempts, delay_ms }
    }

    /// Element checks: 3 tries, 1s apart
    pub const fn element() -> Self {
        Self::new(3, 1000)
    }

    /// Page loads: 3 tries, 2s apart
    pub const fn navigation() -> Self {
        Self::new(3, 2000)
    }

    /// Credential submission: 3 tries, 2s apart
    pub const fn authentication() -> Self {
        Self::new(3, 2000)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::element()
    }
}

/// Outcome of one attempt
#[derive(Debug)]
pub enum Attempt<T> {
    Ready(T),
    Pending(String),
}

/// Run `attempt` until it reports [`Attempt::Ready`] or the policy runs out.
///
/// Sleeps only between attempts. An `Err` from `attempt` is not retried and
/// is returned as-is; exhaustion is turned into an error by `exhausted`,
/// which receives the number of attempts made.
pub async fn retry<T, F, Fut, X>(
    policy: &RetryPolicy,
    what: &str,
    mut attempt: F,
    exhausted: X,
) -> E2eResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = E2eResult<Attempt<T>>>,
    X: FnOnce(u32) -> E2eError,
{
    let attempts = policy.attempts.max(1);

    for n in 1..=attempts {
        match attempt(n).await? {
            Attempt::Ready(value) => {
                debug!("{} succeeded on attempt {}", what, n);
                return Ok(value);
            }
            Attempt::Pending(reason) => {
                warn!("{}: attempt {} of {} failed: {}", what, n, attempts, reason);
                if n < attempts {
                    tokio::time::sleep(policy.delay()).await;
                }
            }
        }
    }

    Err(exhausted(attempts))
}

/// Condition an element check waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    /// At least one match in the DOM
    Present,
    /// No match in the DOM
    Absent,
    /// At least one displayed match
    Visible,
}

impl ElementState {
    async fn holds<D: Driver + ?Sized>(self, driver: &D, locator: &Locator) -> E2eResult<bool> {
        Ok(match self {
            ElementState::Present => driver.count(locator).await? > 0,
            ElementState::Absent => driver.count(locator).await? == 0,
            ElementState::Visible => driver.is_visible(locator).await?,
        })
    }

    pub fn failure_text(self) -> &'static str {
        match self {
            ElementState::Present => "not found",
            ElementState::Absent => "still present",
            ElementState::Visible => "not visible",
        }
    }
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementState::Present => "present",
            ElementState::Absent => "absent",
            ElementState::Visible => "visible",
        };
        f.write_str(s)
    }
}

/// Poll until `locator` is in `state`; exhaustion is a fatal assertion
pub async fn verify_element<D: Driver + ?Sized>(
    driver: &D,
    locator: &Locator,
    state: ElementState,
    policy: &RetryPolicy,
) -> E2eResult<()> {
    retry(
        policy,
        &format!("Expect '{}' {}", locator, state),
        move |_| async move {
            if state.holds(driver, locator).await? {
                Ok(Attempt::Ready(()))
            } else {
                Ok(Attempt::Pending(state.failure_text().to_string()))
            }
        },
        |attempts| E2eError::Assertion {
            selector: locator.to_string(),
            retries: attempts,
            expectation: state,
        },
    )
    .await
}

pub async fn verify_present<D: Driver + ?Sized>(
    driver: &D,
    locator: &Locator,
    policy: &RetryPolicy,
) -> E2eResult<()> {
    verify_element(driver, locator, ElementState::Present, policy).await
}

pub async fn verify_absent<D: Driver + ?Sized>(
    driver: &D,
    locator: &Locator,
    policy: &RetryPolicy,
) -> E2eResult<()> {
    verify_element(driver, locator, ElementState::Absent, policy).await
}

pub async fn wait_visible<D: Driver + ?Sized>(
    driver: &D,
    locator: &Locator,
    policy: &RetryPolicy,
) -> E2eResult<()> {
    verify_element(driver, locator, ElementState::Visible, policy).await
}

/// Open `url`, retrying transport failures only
pub async fn open_with_retries<D: Driver + ?Sized>(
    driver: &D,
    url: &str,
    policy: &RetryPolicy,
) -> E2eResult<()> {
    retry(
        policy,
        &format!("Open {}", url),
        move |_| async move {
            match driver.navigate(url).await {
                Ok(()) => Ok(Attempt::Ready(())),
                Err(e) if e.is_transport() => Ok(Attempt::Pending(e.to_string())),
                Err(e) => Err(e),
            }
        },
        |attempts| E2eError::NavigationExhausted {
            url: url.to_string(),
            attempts,
        },
    )
    .await
}

//! Bounded polling waits.
//!
//! Every poll re-queries the page; nothing is cached between polls.

use super::{Dom, ElementHandle, Locator};
use crate::{Error, Result};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Interval between polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// What a matched element must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Present,
    Visible,
    Clickable,
}

impl Condition {
    pub fn matches(self, element: &ElementHandle) -> bool {
        match self {
            Condition::Present => true,
            Condition::Visible => element.visible,
            Condition::Clickable => element.is_clickable(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Condition::Present => "present",
            Condition::Visible => "visible",
            Condition::Clickable => "clickable",
        })
    }
}

/// A named page state watched by [`wait_for_any`].
#[derive(Debug, Clone)]
pub struct Expectation {
    pub name: &'static str,
    pub locator: Locator,
    pub condition: Condition,
}

impl Expectation {
    pub const fn new(name: &'static str, locator: Locator, condition: Condition) -> Self {
        Self {
            name,
            locator,
            condition,
        }
    }
}

/// Poll `probe` until it yields `Some` or `timeout` elapses (`Ok(None)`).
///
/// The probe always runs at least once.
pub async fn wait_until<T, F, Fut>(timeout: Duration, mut probe: F) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(v) = probe().await? {
            return Ok(Some(v));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// First element matching `locator` that satisfies `condition`, right now.
pub async fn find(
    dom: &dyn Dom,
    locator: &Locator,
    condition: Condition,
) -> Result<Option<ElementHandle>> {
    Ok(dom
        .query(locator)
        .await?
        .into_iter()
        .find(|el| condition.matches(el)))
}

/// Wait for a required element; [`Error::Timeout`] when it never shows up.
pub async fn wait_for(
    dom: &dyn Dom,
    locator: &Locator,
    condition: Condition,
    timeout: Duration,
) -> Result<ElementHandle> {
    probe(dom, locator, condition, timeout).await?.ok_or_else(|| {
        Error::Timeout(format!(
            "{} not {} within {}s",
            locator,
            condition,
            timeout.as_secs_f32()
        ))
    })
}

/// Wait for an optional element; `None` when it never shows up.
pub async fn probe(
    dom: &dyn Dom,
    locator: &Locator,
    condition: Condition,
    timeout: Duration,
) -> Result<Option<ElementHandle>> {
    let found = wait_until(timeout, || find(dom, locator, condition)).await?;
    if found.is_none() {
        debug!(target: "WAIT", verbosity = "FULL", "{} not {} after {:?}", locator, condition, timeout);
    }
    Ok(found)
}

/// Wait until no visible element matches `locator`.
pub async fn wait_gone(dom: &dyn Dom, locator: &Locator, timeout: Duration) -> Result<()> {
    let gone = wait_until(timeout, || async move {
        let still_there = find(dom, locator, Condition::Visible).await?.is_some();
        Ok((!still_there).then_some(()))
    })
    .await?;
    gone.ok_or_else(|| {
        Error::Timeout(format!(
            "{} still visible after {}s",
            locator,
            timeout.as_secs_f32()
        ))
    })
}

/// Wait for the first of `expectations` to be met.
///
/// Blockers are checked before expectations on every poll; a matching blocker
/// ends the wait with [`Error::Blocked`] carrying its name.
pub async fn wait_for_any(
    dom: &dyn Dom,
    expectations: &[Expectation],
    blockers: &[Expectation],
    timeout: Duration,
) -> Result<&'static str> {
    let hit = wait_until(timeout, || async move {
        for b in blockers {
            if find(dom, &b.locator, b.condition).await?.is_some() {
                return Err(Error::Blocked(b.name.to_string()));
            }
        }
        for e in expectations {
            if find(dom, &e.locator, e.condition).await?.is_some() {
                return Ok(Some(e.name));
            }
        }
        Ok(None)
    })
    .await?;

    hit.ok_or_else(|| {
        let names: Vec<&str> = expectations.iter().map(|e| e.name).collect();
        Error::Timeout(format!(
            "none of [{}] within {}s",
            names.join(", "),
            timeout.as_secs_f32()
        ))
    })
}

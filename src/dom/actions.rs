//! Click and type primitives.
//!
//! These never return errors: a failed action is logged and reported as
//! `false`, and the calling flow turns that into a reason tag.

use super::wait::{self, wait_for, wait_for_any, wait_until, Condition, Expectation};
use super::{Dom, ElementHandle, Locator};
use crate::{Error, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Wait for `locator` to be clickable and click it.
///
/// A click that hits a stale node re-locates and clicks exactly once more.
pub async fn click(dom: &dyn Dom, locator: &Locator, desc: &str, timeout: Duration) -> bool {
    click_any(dom, std::slice::from_ref(locator), desc, timeout).await
}

/// Click the first of `locators` that becomes clickable.
///
/// All locators are polled together, so a fallback costs no extra timeout.
pub async fn click_any(dom: &dyn Dom, locators: &[Locator], desc: &str, timeout: Duration) -> bool {
    debug!(target: "CLICK", verbosity = "FULL", "attempting to click {}", desc);
    match try_click_any(dom, locators, desc, timeout).await {
        Ok(locator) => {
            info!(target: "CLICK", verbosity = "FULL", "clicked {} ({})", desc, locator);
            true
        }
        Err(e) => {
            warn!(target: "CLICK", "could not click {} -> {}", desc, e);
            false
        }
    }
}

async fn try_click_any<'l>(
    dom: &dyn Dom,
    locators: &'l [Locator],
    desc: &str,
    timeout: Duration,
) -> Result<&'l Locator> {
    let (locator, el) = locate_clickable(dom, locators, timeout).await?;
    match dom.click(&el).await {
        Ok(()) => Ok(locator),
        Err(e) if e.is_stale() => {
            warn!(target: "CLICK", "stale element -> retrying {}", desc);
            let (locator, el) = locate_clickable(dom, locators, timeout).await?;
            dom.click(&el).await?;
            Ok(locator)
        }
        Err(e) => Err(e),
    }
}

async fn locate_clickable<'l>(
    dom: &dyn Dom,
    locators: &'l [Locator],
    timeout: Duration,
) -> Result<(&'l Locator, ElementHandle)> {
    let found = wait_until(timeout, || async move {
        for locator in locators {
            if let Some(el) = wait::find(dom, locator, Condition::Clickable).await? {
                return Ok(Some((locator, el)));
            }
        }
        Ok(None)
    })
    .await?;

    found.ok_or_else(|| {
        let all: Vec<String> = locators.iter().map(ToString::to_string).collect();
        Error::Timeout(format!(
            "{} not clickable within {}s",
            all.join(" | "),
            timeout.as_secs_f32()
        ))
    })
}

/// Click an element already read from `locator`.
///
/// If the node went stale, `locator` is queried again and the match with the
/// same text is clicked exactly once more.
pub async fn click_element(
    dom: &dyn Dom,
    element: &ElementHandle,
    locator: &Locator,
    desc: &str,
) -> bool {
    match try_click_element(dom, element, locator, desc).await {
        Ok(()) => {
            info!(target: "CLICK", verbosity = "FULL", "clicked {}", desc);
            true
        }
        Err(e) => {
            warn!(target: "CLICK", "could not click {} -> {}", desc, e);
            false
        }
    }
}

async fn try_click_element(
    dom: &dyn Dom,
    element: &ElementHandle,
    locator: &Locator,
    desc: &str,
) -> Result<()> {
    match dom.click(element).await {
        Err(e) if e.is_stale() => {
            warn!(target: "CLICK", "stale element -> retrying {}", desc);
            let again = dom
                .query(locator)
                .await?
                .into_iter()
                .find(|el| el.text == element.text)
                .ok_or(e)?;
            dom.click(&again).await
        }
        other => other,
    }
}

/// Type `text` into `locator` and confirm the field holds exactly `text`.
pub async fn send_text(
    dom: &dyn Dom,
    locator: &Locator,
    text: &str,
    timeout: Duration,
    clear: bool,
) -> bool {
    match try_send_text(dom, locator, text, timeout, clear).await {
        Ok(true) => {
            info!(target: "SENDTEXT", verbosity = "MIN", "sent text to {}", locator);
            true
        }
        // Values are not logged; the field may hold a password.
        Ok(false) => false,
        Err(e) => {
            warn!(target: "SENDTEXT", "could not send text to {} -> {}", locator, e);
            false
        }
    }
}

async fn try_send_text(
    dom: &dyn Dom,
    locator: &Locator,
    text: &str,
    timeout: Duration,
    clear: bool,
) -> Result<bool> {
    let el = wait_for(dom, locator, Condition::Clickable, timeout).await?;
    if clear {
        dom.clear(&el).await?;
    }
    dom.type_text(&el, text).await?;

    let typed = dom.value(&el).await?;
    if typed != text {
        warn!(
            target: "SENDTEXT",
            verbosity = "FULL",
            "{} mismatch -> expected {} chars, field holds {}",
            locator,
            text.chars().count(),
            typed.chars().count()
        );
        return Ok(false);
    }
    Ok(true)
}

/// Scroll an element to the middle of the viewport.
pub async fn scroll_into_view(dom: &dyn Dom, element: &ElementHandle) -> bool {
    match dom.scroll_into_view(element).await {
        Ok(()) => true,
        Err(e) => {
            debug!(target: "CLICK", "scroll into view failed -> {}", e);
            false
        }
    }
}

/// Click `locator`, then wait for the page to reach one of `expectations`.
///
/// Returns the name of the state reached. Blockers end the wait early with
/// [`Error::Blocked`].
pub async fn click_and_expect(
    dom: &dyn Dom,
    locator: &Locator,
    desc: &str,
    expectations: &[Expectation],
    blockers: &[Expectation],
    click_timeout: Duration,
    expect_timeout: Duration,
) -> Result<&'static str> {
    if !click(dom, locator, desc, click_timeout).await {
        return Err(Error::ElementNotFound(desc.to_string()));
    }
    let matched = wait_for_any(dom, expectations, blockers, expect_timeout).await?;
    debug!(target: "WAIT", verbosity = "MED", "{} -> {}", desc, matched);
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors;
    use crate::testing::{FakeCompass, Screen};

    const SECS: Duration = Duration::from_secs(8);

    #[tokio::test(start_paused = true)]
    async fn test_click_records_one_click() {
        let fake = FakeCompass::at(Screen::Mileage);
        assert!(click(&fake, &selectors::NEXT_BUTTON, "Next", SECS).await);
        assert_eq!(fake.clicks(), vec!["next"]);
        assert_eq!(fake.screen(), Screen::Opcode);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_retries_stale_once() {
        let fake = FakeCompass::at(Screen::Mileage);
        fake.stale_once("next");
        assert!(click(&fake, &selectors::NEXT_BUTTON, "Next", SECS).await);
        assert_eq!(fake.clicks(), vec!["next"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_element_retries_stale_once() {
        let fake = FakeCompass::at(Screen::Opcode);
        let tiles = fake.query(&selectors::OPCODE_ITEMS).await.unwrap();
        fake.stale_once("opcode-2");
        assert!(click_element(&fake, &tiles[2], &selectors::OPCODE_ITEMS, "opcode").await);
        assert_eq!(fake.clicks(), vec!["opcode-2"]);

        let fake = FakeCompass::at(Screen::Opcode);
        let tiles = fake.query(&selectors::OPCODE_ITEMS).await.unwrap();
        fake.stale_times("opcode-2", 2);
        assert!(!click_element(&fake, &tiles[2], &selectors::OPCODE_ITEMS, "opcode").await);
        assert!(fake.clicks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_missing_is_false() {
        let fake = FakeCompass::at(Screen::Home);
        assert!(!click(&fake, &selectors::ADD_WORK_ITEM, "Add Work Item", SECS).await);
        assert!(fake.clicks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_any_falls_back_without_waiting_out_first() {
        let fake = FakeCompass::at(Screen::CardOpen);
        fake.break_locator(&selectors::MARK_COMPLETE[0]);
        let start = tokio::time::Instant::now();
        assert!(click_any(&fake, &selectors::MARK_COMPLETE, "Mark Complete", SECS).await);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(fake.screen(), Screen::CompleteDialog);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_text_reads_back() {
        let fake = FakeCompass::at(Screen::Wwid);
        assert!(send_text(&fake, &selectors::WWID_INPUT, "W123456", SECS, true).await);
        assert_eq!(fake.value_of("wwid"), "W123456");
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_text_clears_first() {
        let fake = FakeCompass::at(Screen::Wwid);
        assert!(send_text(&fake, &selectors::WWID_INPUT, "OLD", SECS, true).await);
        assert!(!send_text(&fake, &selectors::WWID_INPUT, "NEW", SECS, false).await);
        assert_eq!(fake.value_of("wwid"), "OLDNEW");
        assert!(send_text(&fake, &selectors::WWID_INPUT, "NEW", SECS, true).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_text_mismatch_is_false() {
        let fake = FakeCompass::at(Screen::Wwid);
        fake.mangle("wwid");
        assert!(!send_text(&fake, &selectors::WWID_INPUT, "W123456", SECS, true).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_and_expect() {
        let fake = FakeCompass::at(Screen::Kmsi);
        let expectations = [Expectation::new(
            "app_shell",
            selectors::APP_SHELL,
            Condition::Present,
        )];
        let matched = click_and_expect(
            &fake,
            &selectors::KMSI_NO,
            "Stay signed in: No",
            &expectations,
            &selectors::LOGIN_BLOCKERS,
            SECS,
            SECS,
        )
        .await
        .unwrap();
        assert_eq!(matched, "app_shell");

        let err = click_and_expect(
            &fake,
            &selectors::KMSI_NO,
            "Stay signed in: No",
            &expectations,
            &[],
            SECS,
            SECS,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::ElementNotFound(_)));
    }
}

//! Browser lifecycle, sign-in, and navigation between vehicles.

use crate::config::{BrowserConfig, Config};
use crate::dom::actions::{click, click_and_expect, send_text};
use crate::dom::wait::{self, wait_for_any, wait_until, Condition, Expectation};
use crate::flows::{FlowResult, FlowStatus, Reason};
use crate::{selectors, Dom, Error, Result};
use eoka::{Browser, Page};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const LOGIN: &str = "LOGIN";
const NAV: &str = "NAV";
const MVA: &str = "MVA";

/// Back-clicks allowed when recovering to the home screen.
pub const HOME_MAX_CLICKS: usize = 5;

/// How long each back-click waits for the home screen.
const HOME_PROBE: Duration = Duration::from_millis(1500);

const APP_SHELL: Expectation =
    Expectation::new("app_shell", selectors::APP_SHELL, Condition::Visible);
const LOGIN_FORM: Expectation =
    Expectation::new("login_form", selectors::LOGIN_EMAIL, Condition::Visible);
const PASSWORD_FIELD: Expectation =
    Expectation::new("password_field", selectors::LOGIN_PASSWORD, Condition::Visible);
const KMSI_PROMPT: Expectation =
    Expectation::new("kmsi_prompt", selectors::KMSI_NO, Condition::Visible);
const HOME: Expectation = Expectation::new("home", selectors::CAMERA_BUTTON, Condition::Visible);

/// The one browser window a run drives.
pub struct Session {
    browser: Browser,
    page: Page,
}

impl Session {
    /// Launch a browser with `config` and open a blank page.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!(
            target: NAV,
            "launching browser (headless: {}, proxy: {:?})",
            config.headless,
            config.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        Ok(Self { browser, page })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}

/// Sign in if needed, open Compass Mobile and enter the WWID.
///
/// Ends on the home screen. Every failure is [`Error::Login`] carrying the
/// step that stopped it, or the name of the blocking page.
#[instrument(skip_all)]
pub async fn ensure_ready(dom: &dyn Dom, config: &Config) -> Result<()> {
    ensure_logged_in(dom, config).await?;
    go_to_mobile_home(dom, config).await?;
    enter_wwid(dom, config).await?;
    info!(target: LOGIN, verbosity = "MIN", "Compass Mobile ready");
    Ok(())
}

/// `Login(tag)`, unless `err` is a blocker, which keeps its own name.
fn login_error(err: Error, tag: &str) -> Error {
    match err {
        Error::Blocked(reason) => {
            warn!(target: LOGIN, verbosity = "MIN", "sign-in blocked by {}", reason);
            Error::Login(reason)
        }
        other => {
            warn!(target: LOGIN, "{} -> {}", tag, other);
            Error::Login(tag.to_string())
        }
    }
}

async fn ensure_logged_in(dom: &dyn Dom, config: &Config) -> Result<()> {
    info!(target: LOGIN, verbosity = "MED", "opening {}", config.urls.login);
    dom.goto(&config.urls.login).await?;

    let landed = wait_for_any(
        dom,
        &[APP_SHELL, LOGIN_FORM],
        &selectors::LOGIN_BLOCKERS,
        config.timeouts.login(),
    )
    .await
    .map_err(|e| login_error(e, "login_page_not_ready"))?;

    if landed == APP_SHELL.name {
        info!(target: LOGIN, verbosity = "MIN", "existing session reused");
        return Ok(());
    }
    login(dom, config).await
}

async fn login(dom: &dyn Dom, config: &Config) -> Result<()> {
    let element = config.timeouts.element();
    let transition = config.timeouts.login();
    let blockers = &selectors::LOGIN_BLOCKERS;

    if !send_text(dom, &selectors::LOGIN_EMAIL, &config.username, element, true).await {
        return Err(Error::Login("email_entry_failed".into()));
    }
    click_and_expect(
        dom,
        &selectors::LOGIN_SUBMIT,
        "Next",
        &[PASSWORD_FIELD],
        blockers,
        element,
        transition,
    )
    .await
    .map_err(|e| login_error(e, "login_transition_missing_password_field"))?;

    if !send_text(dom, &selectors::LOGIN_PASSWORD, &config.password, element, true).await {
        return Err(Error::Login("password_entry_failed".into()));
    }
    let after_sign_in = click_and_expect(
        dom,
        &selectors::LOGIN_SUBMIT,
        "Sign in",
        &[KMSI_PROMPT, APP_SHELL],
        blockers,
        element,
        transition,
    )
    .await
    .map_err(|e| login_error(e, "login_post_signin_no_transition"))?;

    if after_sign_in == KMSI_PROMPT.name {
        click_and_expect(
            dom,
            &selectors::KMSI_NO,
            "Stay signed in: No",
            &[APP_SHELL],
            blockers,
            element,
            transition,
        )
        .await
        .map_err(|e| login_error(e, "login_post_kmsi_no_transition"))?;
    }

    info!(target: LOGIN, verbosity = "MIN", "signed in as {}", config.username);
    Ok(())
}

/// The launcher link opens Compass Mobile in a new tab; follow its target here.
async fn go_to_mobile_home(dom: &dyn Dom, config: &Config) -> Result<()> {
    let element = config.timeouts.element();
    let link = wait::probe(dom, &selectors::COMPASS_MOBILE_LINK, Condition::Clickable, element)
        .await?
        .ok_or_else(|| Error::Login("compass_mobile_button_missing".into()))?;

    match dom.attribute(&link, "href").await? {
        Some(href) if !href.is_empty() => {
            info!(target: NAV, verbosity = "MED", "opening Compass Mobile at {}", href);
            dom.goto(&href).await?;
        }
        _ => {
            debug!(target: NAV, "Compass Mobile link has no href, clicking it");
            dom.click(&link).await?;
        }
    }

    wait::probe(dom, &selectors::WWID_INPUT, Condition::Visible, config.timeouts.login())
        .await?
        .ok_or_else(|| Error::Login("wwid_field_missing".into()))?;
    Ok(())
}

async fn enter_wwid(dom: &dyn Dom, config: &Config) -> Result<()> {
    let element = config.timeouts.element();
    if !send_text(dom, &selectors::WWID_INPUT, &config.login_id, element, true).await {
        return Err(Error::Login("wwid_entry_failed".into()));
    }
    click_and_expect(
        dom,
        &selectors::WWID_SUBMIT,
        "WWID Submit",
        &[HOME],
        &[],
        element,
        config.timeouts.login(),
    )
    .await
    .map_err(|e| login_error(e, "wwid_submit_no_transition"))?;
    info!(target: LOGIN, verbosity = "MED", "WWID accepted");
    Ok(())
}

/// Type `mva` into the home screen's search field and wait for the vehicle.
#[instrument(skip_all, fields(mva = %mva))]
pub async fn open_vehicle(dom: &dyn Dom, config: &Config, mva: &str) -> FlowResult {
    match try_open_vehicle(dom, config, mva).await {
        Ok(res) => res,
        Err(e) => {
            warn!(target: MVA, "{} - could not enter MVA -> {}", mva, e);
            FlowResult::failed(Reason::MvaInput, mva)
        }
    }
}

async fn try_open_vehicle(dom: &dyn Dom, config: &Config, mva: &str) -> Result<FlowResult> {
    let input = wait_until(config.timeouts.element(), || async move {
        for locator in &selectors::MVA_INPUTS {
            if let Some(el) = wait::find(dom, locator, Condition::Clickable).await? {
                return Ok(Some(el));
            }
        }
        Ok(None)
    })
    .await?;
    let Some(input) = input else {
        warn!(target: MVA, "{} - MVA input field not found", mva);
        return Ok(FlowResult::failed(Reason::MvaInput, mva));
    };

    dom.clear(&input).await?;
    dom.type_text(&input, mva).await?;
    debug!(target: MVA, verbosity = "MED", "{} - MVA entered", mva);

    let panel = wait::probe(
        dom,
        &selectors::VEHICLE_PROPERTIES,
        Condition::Visible,
        config.settle_timeout(),
    )
    .await?;
    match panel {
        Some(_) => {
            info!(target: MVA, verbosity = "MIN", "{} - vehicle opened", mva);
            Ok(FlowResult::ok(mva))
        }
        None => {
            warn!(target: MVA, verbosity = "MIN", "{} - no vehicle found for MVA", mva);
            Ok(FlowResult::new(FlowStatus::Skipped, mva).with_reason(Reason::UnknownMva))
        }
    }
}

/// Click the back arrow until the home screen shows, at most `max_clicks` times.
#[instrument(skip_all)]
pub async fn navigate_back_to_home(dom: &dyn Dom, config: &Config, max_clicks: usize) -> bool {
    match try_back_to_home(dom, config, max_clicks).await {
        Ok(home) => home,
        Err(e) => {
            warn!(target: NAV, "navigating home failed -> {}", e);
            false
        }
    }
}

async fn try_back_to_home(dom: &dyn Dom, config: &Config, max_clicks: usize) -> Result<bool> {
    for attempt in 1..=max_clicks {
        if wait::find(dom, &selectors::CAMERA_BUTTON, Condition::Visible).await?.is_some() {
            info!(target: NAV, verbosity = "MED", "home screen reached");
            return Ok(true);
        }
        if !click(dom, &selectors::BACK_BUTTON, "back arrow", config.timeouts.element()).await {
            warn!(target: NAV, "back arrow not available after {} clicks", attempt - 1);
            break;
        }
        if wait::probe(dom, &selectors::CAMERA_BUTTON, Condition::Visible, HOME_PROBE)
            .await?
            .is_some()
        {
            info!(target: NAV, verbosity = "MED", "home screen reached after {} back clicks", attempt);
            return Ok(true);
        }
    }

    let home = wait::find(dom, &selectors::CAMERA_BUTTON, Condition::Visible)
        .await?
        .is_some();
    if !home {
        warn!(target: NAV, verbosity = "MIN", "home screen not reached after {} back clicks", max_clicks);
    }
    Ok(home)
}

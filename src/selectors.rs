//! Locators for the Compass fleet app and its sign-in pages.
//!
//! Relative XPaths (leading `.`) are only meaningful with
//! [`Dom::child_text`](crate::Dom::child_text).

use crate::dom::wait::{Condition, Expectation};
use crate::Locator;

// --- Sign-in -------------------------------------------------------------

pub const LOGIN_EMAIL: Locator = Locator::css("input[name='loginfmt']");
pub const LOGIN_PASSWORD: Locator = Locator::css("input[name='passwd']");
/// "Next" after the email and "Sign in" after the password share one id.
pub const LOGIN_SUBMIT: Locator = Locator::css("#idSIButton9");
/// "No" on the stay-signed-in prompt.
pub const KMSI_NO: Locator = Locator::css("#idBtn_Back");

pub const APP_SHELL: Locator = Locator::xpath(
    "//span[contains(text(),'Compass Mobile')]|//a[@role='button']//span[normalize-space()='Compass Mobile']",
);
pub const COMPASS_MOBILE_LINK: Locator =
    Locator::xpath("//a[@role='button'][.//span[normalize-space()='Compass Mobile']]");

pub const WWID_INPUT: Locator = Locator::css("input[class*='fleet-operations-pwa__text-input__']");
pub const WWID_SUBMIT: Locator = Locator::xpath("//button[.//span[normalize-space()='Submit']]");

/// Pages that stop an unattended sign-in.
pub const LOGIN_BLOCKERS: [Expectation; 5] = [
    Expectation::new(
        "unexpected_account_picker",
        Locator::xpath(
            "//*[contains(normalize-space(),'Pick an account') or contains(normalize-space(),'Use another account')]",
        ),
        Condition::Visible,
    ),
    Expectation::new(
        "unexpected_mfa_required",
        Locator::xpath(
            "//*[contains(normalize-space(),'Approve sign in request') or contains(normalize-space(),'Enter code') or contains(normalize-space(),'verification')]",
        ),
        Condition::Visible,
    ),
    Expectation::new(
        "unexpected_mfa_required",
        Locator::css("input[name='otc']"),
        Condition::Present,
    ),
    Expectation::new(
        "unexpected_consent_required",
        Locator::xpath(
            "//*[contains(normalize-space(),'Permissions requested') or contains(normalize-space(),'Need admin approval') or contains(normalize-space(),'consent')]",
        ),
        Condition::Visible,
    ),
    Expectation::new(
        "unexpected_conditional_access",
        Locator::xpath("//*[contains(normalize-space(),'More information required')]"),
        Condition::Visible,
    ),
];

// --- Home / vehicle ------------------------------------------------------

pub const CAMERA_BUTTON: Locator =
    Locator::xpath("//button[contains(@class,'fleet-operations-pwa__camera-button')]");
pub const BACK_BUTTON: Locator =
    Locator::xpath("//button[contains(@class,'fleet-operations-pwa__back-button')]");

/// MVA input, probed in order.
pub const MVA_INPUTS: [Locator; 3] = [
    Locator::css("input.bp6-input[placeholder*='Enter MVA']"),
    Locator::xpath("//input[@type='text' and contains(@placeholder,'MVA')]"),
    Locator::xpath("//div[@role='tabpanel' and @aria-hidden='false']//input[@type='text']"),
];

pub const VEHICLE_PROPERTIES: Locator =
    Locator::xpath("//div[contains(@class,'vehicle-properties-container')]");

// --- Work items ----------------------------------------------------------

pub const WORK_ITEM_TILES: Locator = Locator::xpath(
    "//div[contains(@class,'scan-record-header') and .//div[contains(@class,'scan-record-header-title')]]",
);
pub const WORK_ITEM_TITLE: Locator = Locator::xpath(
    ".//div[contains(@class,'scan-record-header-title') and not(contains(@class,'scan-record-header-title-right'))]",
);
pub const WORK_ITEM_STATUS: Locator =
    Locator::xpath(".//div[contains(@class,'scan-record-header-title-right')]");

pub const ADD_WORK_ITEM: Locator = Locator::xpath("//button[normalize-space()='Add Work Item']");
pub const CREATE_WORK_ITEM: Locator =
    Locator::xpath("//button[normalize-space()='Create Work Item']");

/// Class selector first, visible text as fallback.
pub const MARK_COMPLETE: [Locator; 2] = [
    Locator::css("button.fleet-operations-pwa__mark-complete-button__spuz8c"),
    Locator::xpath("//button[normalize-space()='Mark Complete']"),
];

pub const COMPLETE_DIALOG: Locator = Locator::css("div.bp6-dialog");
pub const COMPLETE_NOTE: Locator = Locator::css("textarea.bp6-text-area");
pub const COMPLETE_WORK_ITEM: Locator = Locator::xpath(
    "//div[contains(@class,'bp6-dialog')]//button[normalize-space()='Complete Work Item']",
);

// --- Complaints ----------------------------------------------------------

pub const COMPLAINT_TILES: Locator =
    Locator::xpath("//div[contains(@class,'fleet-operations-pwa__complaintItem__')]");
pub const COMPLAINT_TILE_CONTENT: Locator = Locator::xpath(".//div[contains(@class,'tileContent')]");

pub const NEW_COMPLAINT: [Locator; 2] = [
    Locator::xpath("//button[normalize-space()='Add New Complaint']"),
    Locator::xpath("//button[normalize-space()='Create New Complaint']"),
];
pub const DRIVABLE_YES: Locator = Locator::xpath("//button[normalize-space()='Yes']");
pub const COMPLAINT_TYPE_PM: Locator = Locator::xpath("//button[normalize-space()='PM']");
pub const SUBMIT_COMPLAINT: Locator =
    Locator::xpath("//button[normalize-space()='Submit Complaint']");

// --- Wizard --------------------------------------------------------------

pub const NEXT_BUTTON: Locator = Locator::xpath("//button[normalize-space()='Next']");

/// The wizard's Next button, which has shipped in several shapes.
pub const DIALOG_NEXT: [Locator; 3] = [
    Locator::css("button.fleet-operations-pwa__nextButton__153vo4c"),
    Locator::xpath("//button[.//p[normalize-space()='Next']]"),
    NEXT_BUTTON,
];

pub const OPCODE_ITEMS: Locator = Locator::xpath("//div[contains(@class,'opCodeItem')]");
pub const OPCODE_TEXT: Locator = Locator::xpath(".//div[contains(@class,'opCodeText')]");

//! Straight-line steps through the work-item wizard dialogs.

use super::source::{COMPLAINT, DIALOG, MILEAGE, OPCODE};
use super::{Reason, Step};
use crate::dom::actions::{self, click, click_any, send_text};
use crate::dom::wait::{self, wait_for, wait_gone, Condition};
use crate::{selectors, Config, Dom, Result};
use tracing::{debug, error, info, instrument, warn};

/// Next on the mileage dialog.
#[instrument(skip_all)]
pub async fn complete_mileage_dialog(dom: &dyn Dom, config: &Config, mva: &str) -> Step {
    let timeout = config.timeouts.element();
    if click(dom, &selectors::NEXT_BUTTON, "mileage Next", timeout).await {
        info!(target: MILEAGE, verbosity = "MIN", "{} - Next clicked on mileage dialog", mva);
        Ok(())
    } else {
        warn!(target: MILEAGE, "{} - Next button not found", mva);
        Err(Reason::NextBtn)
    }
}

/// Pick the opcode tile whose label is exactly `code`.
#[instrument(skip_all, fields(code = %code))]
pub async fn select_opcode(dom: &dyn Dom, config: &Config, mva: &str, code: &str) -> Step {
    match try_select_opcode(dom, config, mva, code).await {
        Ok(step) => step,
        Err(e) => {
            warn!(target: OPCODE, "{} - opcode selection failed -> {}", mva, e);
            Err(Reason::OpcodeClick)
        }
    }
}

async fn try_select_opcode(dom: &dyn Dom, config: &Config, mva: &str, code: &str) -> Result<Step> {
    // The list renders as a whole; wait for the first tile, then read them all.
    wait::probe(
        dom,
        &selectors::OPCODE_ITEMS,
        Condition::Present,
        config.timeouts.element(),
    )
    .await?;

    let tiles = dom.query(&selectors::OPCODE_ITEMS).await?;
    let mut matched = None;
    for tile in tiles {
        let label = dom
            .child_text(&tile, &selectors::OPCODE_TEXT)
            .await?
            .unwrap_or_else(|| tile.text.clone());
        if label.trim() == code {
            matched = Some(tile);
            break;
        }
    }

    let Some(tile) = matched else {
        warn!(target: OPCODE, "{} - opcode '{}' not found", mva, code);
        return Ok(Err(Reason::OpcodeNotFound));
    };

    actions::scroll_into_view(dom, &tile).await;
    if !actions::click_element(dom, &tile, &selectors::OPCODE_ITEMS, "opcode tile").await {
        warn!(target: OPCODE, "{} - could not click opcode '{}'", mva, code);
        return Ok(Err(Reason::OpcodeClick));
    }
    info!(target: OPCODE, verbosity = "MIN", "{} - opcode '{}' selected", mva, code);
    Ok(Ok(()))
}

/// Next inside the wizard, whichever shape the button has.
#[instrument(skip_all)]
pub async fn click_dialog_next(dom: &dyn Dom, config: &Config) -> bool {
    let clicked = click_any(
        dom,
        &selectors::DIALOG_NEXT,
        "dialog Next",
        config.timeouts.element(),
    )
    .await;
    if clicked {
        info!(target: DIALOG, verbosity = "MED", "Next button clicked");
    }
    clicked
}

/// Create a PM complaint: new complaint, drivable, type PM, submit.
#[instrument(skip_all)]
pub async fn create_complaint_entries(dom: &dyn Dom, config: &Config, mva: &str) -> Step {
    let timeout = config.timeouts.element();

    if !click_any(dom, &selectors::NEW_COMPLAINT, "Add/Create New Complaint", timeout).await {
        warn!(target: COMPLAINT, "{} - could not click Add/Create New Complaint", mva);
        return Err(Reason::AddBtn);
    }
    info!(target: COMPLAINT, verbosity = "MIN", "{} - creating new complaint", mva);

    if !click(dom, &selectors::DRIVABLE_YES, "Drivability Yes", timeout).await {
        warn!(target: COMPLAINT, "{} - could not click Yes in drivability step", mva);
        return Err(Reason::Drivability);
    }
    debug!(target: COMPLAINT, verbosity = "MED", "{} - drivability Yes clicked", mva);

    // Picking the type advances on its own; there is no Next here.
    if !click(dom, &selectors::COMPLAINT_TYPE_PM, "Complaint type PM", timeout).await {
        warn!(target: COMPLAINT, "{} - complaint type 'PM' not found", mva);
        return Err(Reason::ComplaintType);
    }
    debug!(target: COMPLAINT, verbosity = "MED", "{} - complaint type 'PM' selected", mva);

    if !click(dom, &selectors::SUBMIT_COMPLAINT, "Submit Complaint", timeout).await {
        warn!(target: COMPLAINT, "{} - could not submit additional info", mva);
        return Err(Reason::SubmitInfo);
    }
    info!(target: COMPLAINT, verbosity = "MIN", "{} - new PM complaint submitted", mva);
    Ok(())
}

/// Fill the completion dialog with `note` and wait for it to close.
#[instrument(skip_all)]
pub async fn complete_work_item_dialog(dom: &dyn Dom, config: &Config, note: &str) -> Step {
    match try_complete_dialog(dom, config, note).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(target: DIALOG, verbosity = "MIN", "completion dialog -> {}", e);
            Err(Reason::DialogException)
        }
    }
}

async fn try_complete_dialog(dom: &dyn Dom, config: &Config, note: &str) -> Result<()> {
    let timeout = config.timeouts.dialog();

    wait_for(dom, &selectors::COMPLETE_DIALOG, Condition::Visible, timeout).await?;
    info!(target: DIALOG, verbosity = "MIN", "completion dialog opened");

    if !send_text(dom, &selectors::COMPLETE_NOTE, note, timeout, true).await {
        return Err(crate::Error::ElementNotFound("completion note".into()));
    }
    debug!(target: DIALOG, verbosity = "MED", "entered note text: {:?}", note);

    if !click(dom, &selectors::COMPLETE_WORK_ITEM, "Complete Work Item", timeout).await {
        return Err(crate::Error::ElementNotFound("Complete Work Item button".into()));
    }

    wait_gone(dom, &selectors::COMPLETE_DIALOG, timeout).await?;
    info!(target: DIALOG, verbosity = "MIN", "completion dialog closed");
    Ok(())
}

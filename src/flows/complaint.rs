//! Pick or create the complaint a new work item is raised against.

use super::dialogs::{self, click_dialog_next, complete_mileage_dialog, select_opcode};
use super::source::COMPLAINT;
use super::state::{plan, Complaint, ComplaintTiles, Plan};
use super::{FlowResult, FlowStatus, Reason};
use crate::dom::actions::click_element;
use crate::dom::wait::{self, wait_until, Condition};
use crate::{selectors, Config, Dom, ElementHandle, Result};
use tracing::{debug, info, instrument, warn};

/// Resolve the complaint for a work item that was just started.
///
/// Ends `associated` (existing PM complaint linked) or `created` (new PM
/// complaint submitted), both with the wizard advanced past the opcode, or
/// `failed` with the step that stopped it.
#[instrument(skip_all)]
pub async fn resolve_complaint(dom: &dyn Dom, config: &Config, mva: &str) -> FlowResult {
    match try_resolve(dom, config, mva).await {
        Ok(res) => res,
        Err(e) => FlowResult::exception(mva, &e),
    }
}

/// Complaint tiles currently offered, with their snapshots.
pub async fn read_complaints(dom: &dyn Dom) -> Result<Vec<(ElementHandle, Complaint)>> {
    let tiles = dom.query(&selectors::COMPLAINT_TILES).await?;
    let mut out = Vec::with_capacity(tiles.len());
    for tile in tiles {
        let kind = dom
            .child_text(&tile, &selectors::COMPLAINT_TILE_CONTENT)
            .await?
            .unwrap_or_else(|| tile.text.clone());
        out.push((tile, Complaint::open(&kind)));
    }
    Ok(out)
}

async fn try_resolve(dom: &dyn Dom, config: &Config, mva: &str) -> Result<FlowResult> {
    settle(dom, config).await?;

    let tiles = read_complaints(dom).await?;
    let complaints: Vec<Complaint> = tiles.iter().map(|(_, c)| c.clone()).collect();
    debug!(
        target: COMPLAINT,
        verbosity = "FULL",
        "{} - complaint tiles: {:?}",
        mva,
        complaints.iter().map(|c| c.kind.as_str()).collect::<Vec<_>>()
    );

    let state = ComplaintTiles::classify(&complaints);
    let pm_count = complaints.iter().filter(|c| c.is_pm()).count();
    if pm_count > 1 {
        warn!(
            target: COMPLAINT,
            verbosity = "MIN",
            "{} - {} PM complaints offered, taking the first",
            mva,
            pm_count
        );
    }

    let status = match plan(state) {
        Plan::CreateNew => {
            info!(
                target: COMPLAINT,
                verbosity = "MIN",
                "{} - no PM complaint ({:?}), creating one",
                mva,
                state
            );
            if let Err(reason) = dialogs::create_complaint_entries(dom, config, mva).await {
                return Ok(FlowResult::failed(reason, mva));
            }
            FlowStatus::Created
        }
        Plan::Associate { index } => {
            let (tile, complaint) = &tiles[index];
            if !click_element(dom, tile, &selectors::COMPLAINT_TILES, "complaint tile").await {
                warn!(target: COMPLAINT, "{} - failed to click complaint tile", mva);
                return Ok(FlowResult::failed(Reason::TileClick, mva));
            }
            info!(
                target: COMPLAINT,
                verbosity = "MIN",
                "{} - complaint '{}' selected",
                mva,
                complaint.kind
            );
            FlowStatus::Associated
        }
    };

    if !click_dialog_next(dom, config).await {
        return Ok(FlowResult::failed(Reason::ComplaintNext, mva));
    }
    if complete_mileage_dialog(dom, config, mva).await.is_err() {
        return Ok(FlowResult::failed(Reason::Mileage, mva));
    }
    if select_opcode(dom, config, mva, &config.flow.opcode).await.is_err() {
        return Ok(FlowResult::failed(Reason::Opcode, mva));
    }

    info!(target: COMPLAINT, verbosity = "MIN", "{} - complaint {}", mva, status);
    Ok(FlowResult::new(status, mva))
}

/// Give the wizard time to render its tiles or the new-complaint button.
async fn settle(dom: &dyn Dom, config: &Config) -> Result<()> {
    let ready = wait_until(config.timeouts.element(), || async move {
        if wait::find(dom, &selectors::COMPLAINT_TILES, Condition::Visible)
            .await?
            .is_some()
        {
            return Ok(Some(()));
        }
        for locator in &selectors::NEW_COMPLAINT {
            if wait::find(dom, locator, Condition::Visible).await?.is_some() {
                return Ok(Some(()));
            }
        }
        Ok(None)
    })
    .await?;
    if ready.is_none() {
        debug!(target: COMPLAINT, "complaint step did not render within timeout");
    }
    Ok(())
}

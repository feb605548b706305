//! Per-vehicle controller: complete the open PM item, or raise and close one.

use super::complaint::resolve_complaint;
use super::dialogs::complete_work_item_dialog;
use super::source::WORKITEM;
use super::state::{route, Route, VehicleState, WorkItem};
use super::{FlowResult, FlowStatus, Reason};
use crate::dom::actions::{click, click_any, click_element};
use crate::dom::wait::{self, wait_until, Condition};
use crate::{selectors, session, Config, Dom, ElementHandle, Result};
use tracing::{debug, info, instrument, warn};

/// Drive one vehicle's PM work item to done.
///
/// `ok / completed_open_pm` when an open PM item was completed, `closed` when
/// a new one was created and completed, `skipped_no_complaint` when no PM
/// complaint could be created, otherwise `failed`.
#[instrument(skip_all, fields(mva = %mva))]
pub async fn handle_pm_work_items(dom: &dyn Dom, config: &Config, mva: &str) -> FlowResult {
    match try_handle(dom, config, mva).await {
        Ok(res) => res,
        Err(e) => FlowResult::exception(mva, &e),
    }
}

async fn try_handle(dom: &dyn Dom, config: &Config, mva: &str) -> Result<FlowResult> {
    settle(dom, config).await?;

    let items = read_work_items(dom).await?;
    let snapshots: Vec<WorkItem> = items.iter().map(|(_, w)| w.clone()).collect();
    let state = VehicleState::classify(&snapshots);
    debug!(
        target: WORKITEM,
        verbosity = "MED",
        "{} - {} work items, {:?}",
        mva,
        snapshots.len(),
        state
    );

    match route(state) {
        Route::CompleteOpen => {
            if let VehicleState::OpenItem { count } = state {
                if count > 1 {
                    warn!(
                        target: WORKITEM,
                        verbosity = "MIN",
                        "{} - {} open PM items, completing the first",
                        mva,
                        count
                    );
                }
            }
            info!(target: WORKITEM, verbosity = "MIN", "{} - open PM work item found", mva);
            Ok(complete_pm_work_item(dom, config, mva).await)
        }
        Route::AddWorkItem => {
            info!(target: WORKITEM, verbosity = "MIN", "{} - no open PM work item, adding one", mva);
            let timeout = config.timeouts.element();
            if !click(dom, &selectors::ADD_WORK_ITEM, "Add Work Item", timeout).await {
                return Ok(FlowResult::failed(Reason::AddBtn, mva));
            }

            let res = resolve_complaint(dom, config, mva).await;
            match res.status {
                FlowStatus::Associated | FlowStatus::Created => {
                    Ok(finalize_work_item(dom, config, mva).await)
                }
                _ if res.reason.is_some_and(no_complaint) => {
                    warn!(target: WORKITEM, verbosity = "MIN", "{} - no complaint linked ({})", mva, res);
                    let skipped = FlowResult {
                        status: FlowStatus::SkippedNoComplaint,
                        reason: res.reason,
                        mva: mva.to_string(),
                    };
                    session::navigate_back_to_home(dom, config, session::HOME_MAX_CLICKS).await;
                    Ok(skipped)
                }
                _ => {
                    warn!(target: WORKITEM, verbosity = "MIN", "{} - complaint step failed ({})", mva, res);
                    Ok(res)
                }
            }
        }
    }
}

/// Reasons from the create-complaint steps: no complaint exists to raise against.
fn no_complaint(reason: Reason) -> bool {
    matches!(
        reason,
        Reason::AddBtn | Reason::Drivability | Reason::ComplaintType | Reason::SubmitInfo
    )
}

/// Work-item tiles on the vehicle screen, with their snapshots.
pub async fn read_work_items(dom: &dyn Dom) -> Result<Vec<(ElementHandle, WorkItem)>> {
    let tiles = dom.query(&selectors::WORK_ITEM_TILES).await?;
    let mut out = Vec::with_capacity(tiles.len());
    for tile in tiles {
        let title = dom
            .child_text(&tile, &selectors::WORK_ITEM_TITLE)
            .await?
            .unwrap_or_default();
        let status = dom
            .child_text(&tile, &selectors::WORK_ITEM_STATUS)
            .await?
            .unwrap_or_default();
        let item = WorkItem::new(&title, &status);
        out.push((tile, item));
    }
    Ok(out)
}

/// Open the first open PM card, Mark Complete, and fill the completion dialog.
#[instrument(skip_all)]
pub async fn complete_pm_work_item(dom: &dyn Dom, config: &Config, mva: &str) -> FlowResult {
    match try_complete(dom, config, mva).await {
        Ok(res) => res,
        Err(e) => FlowResult::exception(mva, &e),
    }
}

async fn try_complete(dom: &dyn Dom, config: &Config, mva: &str) -> Result<FlowResult> {
    let items = read_work_items(dom).await?;
    let Some((card, item)) = items.into_iter().find(|(_, w)| w.is_open_pm()) else {
        warn!(target: WORKITEM, "{} - no open PM card to complete", mva);
        return Ok(FlowResult::failed(Reason::OpenPmCard, mva));
    };

    if !click_element(dom, &card, &selectors::WORK_ITEM_TILES, "PM card").await {
        warn!(target: WORKITEM, "{} - could not open PM card", mva);
        return Ok(FlowResult::failed(Reason::OpenPmCard, mva));
    }
    debug!(target: WORKITEM, verbosity = "MED", "{} - opened '{}' card", mva, item.kind);

    let timeout = config.timeouts.element();
    if !click_any(dom, &selectors::MARK_COMPLETE, "Mark Complete", timeout).await {
        return Ok(FlowResult::failed(Reason::MarkCompleteButton, mva));
    }

    let note = &config.flow.completion_note;
    if let Err(reason) = complete_work_item_dialog(dom, config, note).await {
        return Ok(FlowResult::failed(reason, mva));
    }

    info!(target: WORKITEM, verbosity = "MIN", "{} - PM work item completed", mva);
    Ok(FlowResult::ok(mva).with_reason(Reason::CompletedOpenPm))
}

/// Create the work item the wizard has prepared, then complete it.
#[instrument(skip_all)]
pub async fn finalize_work_item(dom: &dyn Dom, config: &Config, mva: &str) -> FlowResult {
    match try_finalize(dom, config, mva).await {
        Ok(res) => res,
        Err(e) => FlowResult::exception(mva, &e),
    }
}

async fn try_finalize(dom: &dyn Dom, config: &Config, mva: &str) -> Result<FlowResult> {
    let timeout = config.timeouts.element();
    if !click(dom, &selectors::CREATE_WORK_ITEM, "Create Work Item", timeout).await {
        return Ok(FlowResult::failed(Reason::CreateBtn, mva));
    }
    info!(target: WORKITEM, verbosity = "MIN", "{} - work item created", mva);

    // Tiles from earlier items are already on screen; wait for the new open one.
    let open = wait_until(config.timeouts.dialog(), || async move {
        let items = read_work_items(dom).await?;
        Ok(items.iter().any(|(_, w)| w.is_open_pm()).then_some(()))
    })
    .await?;
    if open.is_none() {
        warn!(target: WORKITEM, "{} - no open PM tile after create", mva);
        return Ok(FlowResult::failed(Reason::NoTiles, mva));
    }

    let completed = complete_pm_work_item(dom, config, mva).await;
    if !completed.is(FlowStatus::Ok) {
        warn!(target: WORKITEM, "{} - completing the new work item failed ({})", mva, completed);
        return Ok(FlowResult::failed(Reason::Complete, mva));
    }

    info!(target: WORKITEM, verbosity = "MIN", "{} - work item closed", mva);
    Ok(FlowResult::new(FlowStatus::Closed, mva))
}

/// Give the vehicle screen time to render its tiles or the Add button.
async fn settle(dom: &dyn Dom, config: &Config) -> Result<()> {
    let ready = wait_until(config.settle_timeout(), || async move {
        for locator in [&selectors::WORK_ITEM_TILES, &selectors::ADD_WORK_ITEM] {
            if wait::find(dom, locator, Condition::Visible).await?.is_some() {
                return Ok(Some(()));
            }
        }
        Ok(None)
    })
    .await?;
    if ready.is_none() {
        debug!(target: WORKITEM, "vehicle screen did not settle within timeout");
    }
    Ok(())
}

//! Drives the vehicle list through sign-in and the per-vehicle flow.

mod ledger;

pub use ledger::{Summary, WorkflowExecution, WorkflowStep};

use crate::config::Config;
use crate::flows::work_item::handle_pm_work_items;
use crate::flows::{FlowResult, FlowStatus};
use crate::session::{self, navigate_back_to_home, open_vehicle, HOME_MAX_CLICKS};
use crate::Dom;
use chrono::Local;
use serde_json::json;
use tracing::{debug, error, info, warn};

const RUN: &str = "RUN";

/// Processes a vehicle list against one signed-in page.
pub struct Runner<'a> {
    dom: &'a dyn Dom,
    config: &'a Config,
}

impl<'a> Runner<'a> {
    pub fn new(dom: &'a dyn Dom, config: &'a Config) -> Self {
        Self { dom, config }
    }

    /// Sign in, then run every MVA in order.
    ///
    /// A vehicle's failure never stops the loop; a failed sign-in stops the
    /// run before any vehicle is touched.
    pub async fn run(&self, mvas: &[String]) -> WorkflowExecution {
        let mut execution = WorkflowExecution::new("compass-pm");
        if mvas.is_empty() {
            warn!(target: RUN, verbosity = "MIN", "no MVAs to process");
            execution.finish(true);
            return execution;
        }

        if let Err(e) = session::ensure_ready(self.dom, self.config).await {
            error!(target: RUN, verbosity = "MIN", "sign-in failed -> {}", e);
            self.handle_failure("login").await;
            execution.record(WorkflowStep::failed(
                "login",
                "Sign in and open Compass Mobile",
                json!({ "url": self.config.urls.login }),
                e.to_string(),
            ));
            execution.finish(false);
            return execution;
        }
        execution.record(WorkflowStep::passed(
            "login",
            "Sign in and open Compass Mobile",
            json!({ "url": self.config.urls.login }),
        ));

        for (i, mva) in mvas.iter().enumerate() {
            info!(target: RUN, verbosity = "MIN", "started MVA {}", mva);
            let result = self.process(mva).await;
            if result.status.is_success() {
                info!(target: RUN, verbosity = "MIN", "[{}/{}] {}", i + 1, mvas.len(), result);
            } else {
                warn!(target: RUN, verbosity = "MIN", "[{}/{}] {}", i + 1, mvas.len(), result);
            }
            execution.record_vehicle(&result);
        }

        execution.finish(true);
        info!(target: RUN, verbosity = "MIN", "run complete: {}", execution.summary());
        execution
    }

    async fn process(&self, mva: &str) -> FlowResult {
        let opened = open_vehicle(self.dom, self.config, mva).await;
        let result = if opened.is(FlowStatus::Ok) {
            handle_pm_work_items(self.dom, self.config, mva).await
        } else {
            opened
        };

        if result.is(FlowStatus::Failed) {
            self.handle_failure(mva).await;
        }
        // The MVA field lives on the home screen; get back there for the next one.
        if !navigate_back_to_home(self.dom, self.config, HOME_MAX_CLICKS).await {
            warn!(target: RUN, "{} - could not return to the home screen", mva);
        }
        result
    }

    async fn handle_failure(&self, mva: &str) {
        if let Ok(url) = self.dom.url().await {
            debug!(target: RUN, verbosity = "MED", "{} - failed on {}", mva, url);
        }
        let Some(ref template) = self.config.artifacts.screenshot_on_failure else {
            return;
        };
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let path = template
            .replace("{mva}", mva)
            .replace("{timestamp}", &timestamp);
        info!(target: RUN, verbosity = "MED", "saving failure screenshot to: {}", path);
        match self.dom.screenshot().await {
            Ok(data) => {
                if let Err(e) = std::fs::write(&path, data) {
                    warn!(target: RUN, "failed to save screenshot: {}", e);
                }
            }
            Err(e) => warn!(target: RUN, "failed to take screenshot: {}", e),
        }
    }
}

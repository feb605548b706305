//! Run ledger: one step per vehicle, plus sign-in.

use crate::flows::{FlowResult, FlowStatus};
use crate::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// One unit of work in a run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStep {
    pub name: String,
    pub description: String,
    pub completed: bool,
    pub evidence: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl WorkflowStep {
    pub fn passed(
        name: impl Into<String>,
        description: impl Into<String>,
        evidence: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            completed: true,
            evidence,
            error_message: None,
        }
    }

    pub fn failed(
        name: impl Into<String>,
        description: impl Into<String>,
        evidence: Value,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            completed: false,
            evidence,
            error_message: Some(error.into()),
        }
    }

    /// Step for one vehicle. Only a `failed` result leaves it incomplete.
    pub fn for_vehicle(result: &FlowResult) -> Self {
        let evidence = serde_json::to_value(result).unwrap_or(Value::Null);
        let description = format!("PM work item for MVA {}", result.mva);
        if result.is(FlowStatus::Failed) {
            Self::failed(result.mva.clone(), description, evidence, result.to_string())
        } else {
            Self::passed(result.mva.clone(), description, evidence)
        }
    }
}

/// A whole run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowExecution {
    pub name: String,
    pub started_at: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Local>>,
    pub steps: Vec<WorkflowStep>,
    /// Every planned step ran.
    pub completed: bool,
    /// Completed, and no step failed.
    pub success: bool,
    /// Vehicle counts per final status.
    pub evidence_collected: Map<String, Value>,
}

impl WorkflowExecution {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started_at: Local::now(),
            finished_at: None,
            steps: Vec::new(),
            completed: false,
            success: false,
            evidence_collected: Map::new(),
        }
    }

    pub fn record(&mut self, step: WorkflowStep) {
        self.steps.push(step);
    }

    /// Record a vehicle's step and count its status.
    pub fn record_vehicle(&mut self, result: &FlowResult) {
        let count = self
            .evidence_collected
            .entry(result.status.as_str())
            .or_insert(Value::from(0u64));
        *count = Value::from(count.as_u64().unwrap_or(0) + 1);
        self.record(WorkflowStep::for_vehicle(result));
    }

    /// Close the ledger; `completed` says whether every planned step ran.
    pub fn finish(&mut self, completed: bool) {
        self.finished_at = Some(Local::now());
        self.completed = completed;
        self.success = completed && self.steps.iter().all(|s| s.completed);
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &WorkflowStep> {
        self.steps.iter().filter(|s| !s.completed)
    }

    pub fn summary(&self) -> Summary {
        let count = |status: FlowStatus| {
            self.evidence_collected
                .get(status.as_str())
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize
        };
        Summary {
            vehicles: self.steps.iter().filter(|s| s.name != "login").count(),
            succeeded: count(FlowStatus::Ok) + count(FlowStatus::Closed),
            skipped: count(FlowStatus::Skipped) + count(FlowStatus::SkippedNoComplaint),
            failed: count(FlowStatus::Failed),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_report<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Vehicle tallies for the end-of-run line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub vehicles: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vehicles: {} done, {} skipped, {} failed",
            self.vehicles, self.succeeded, self.skipped, self.failed
        )
    }
}

//! Work-item and complaint flows, and the result every flow returns.

pub mod complaint;
pub mod dialogs;
pub mod state;
pub mod work_item;

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// Log targets shared by the flows.
pub(crate) mod source {
    pub const WORKITEM: &str = "WORKITEM";
    pub const COMPLAINT: &str = "COMPLAINT";
    pub const DIALOG: &str = "DIALOG";
    pub const MILEAGE: &str = "MILEAGE";
    pub const OPCODE: &str = "OPCODE";
}

/// Terminal state of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    Ok,
    Failed,
    Skipped,
    SkippedNoComplaint,
    Closed,
    Associated,
    Created,
}

impl FlowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::SkippedNoComplaint => "skipped_no_complaint",
            Self::Closed => "closed",
            Self::Associated => "associated",
            Self::Created => "created",
        }
    }

    /// The vehicle ended with its PM work item done.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Closed)
    }
}

impl fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a flow ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    NextBtn,
    OpcodeNotFound,
    OpcodeClick,
    AddBtn,
    Drivability,
    ComplaintType,
    SubmitInfo,
    TileClick,
    ComplaintNext,
    Mileage,
    Opcode,
    OpenPmCard,
    MarkCompleteButton,
    DialogException,
    CompletedOpenPm,
    CreateBtn,
    NoTiles,
    Complete,
    MvaInput,
    UnknownMva,
    Exception,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NextBtn => "next_btn",
            Self::OpcodeNotFound => "opcode_not_found",
            Self::OpcodeClick => "opcode_click",
            Self::AddBtn => "add_btn",
            Self::Drivability => "drivability",
            Self::ComplaintType => "complaint_type",
            Self::SubmitInfo => "submit_info",
            Self::TileClick => "tile_click",
            Self::ComplaintNext => "complaint_next",
            Self::Mileage => "mileage",
            Self::Opcode => "opcode",
            Self::OpenPmCard => "open_pm_card",
            Self::MarkCompleteButton => "mark_complete_button",
            Self::DialogException => "dialog_exception",
            Self::CompletedOpenPm => "completed_open_pm",
            Self::CreateBtn => "create_btn",
            Self::NoTiles => "no_tiles",
            Self::Complete => "complete",
            Self::MvaInput => "mva_input",
            Self::UnknownMva => "unknown_mva",
            Self::Exception => "exception",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a straight-line step: done, or the reason it stopped.
pub type Step = std::result::Result<(), Reason>;

/// Outcome of one flow for one vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowResult {
    pub status: FlowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    pub mva: String,
}

impl FlowResult {
    pub fn new(status: FlowStatus, mva: &str) -> Self {
        Self {
            status,
            reason: None,
            mva: mva.to_string(),
        }
    }

    pub fn ok(mva: &str) -> Self {
        Self::new(FlowStatus::Ok, mva)
    }

    pub fn failed(reason: Reason, mva: &str) -> Self {
        Self::new(FlowStatus::Failed, mva).with_reason(reason)
    }

    pub fn with_reason(mut self, reason: Reason) -> Self {
        self.reason = Some(reason);
        self
    }

    /// An error escaped a flow; log it and report `failed / exception`.
    pub fn exception(mva: &str, err: &Error) -> Self {
        error!(target: source::WORKITEM, verbosity = "MIN", "{} - flow exception -> {}", mva, err);
        Self::failed(Reason::Exception, mva)
    }

    pub fn is(&self, status: FlowStatus) -> bool {
        self.status == status
    }
}

impl fmt::Display for FlowResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            Some(reason) => write!(f, "{} {} ({})", self.mva, self.status, reason),
            None => write!(f, "{} {}", self.mva, self.status),
        }
    }
}

//! UI snapshots and the pure decisions taken from them.

/// Status shown on the right of a work-item header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Open,
    Complete,
}

impl ItemState {
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("open") {
            Self::Open
        } else {
            Self::Complete
        }
    }
}

/// A work-item tile as read from the vehicle screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub kind: String,
    pub state: ItemState,
}

impl WorkItem {
    pub fn new(kind: &str, status: &str) -> Self {
        Self {
            kind: kind.trim().to_string(),
            state: ItemState::from_label(status),
        }
    }

    pub fn is_open_pm(&self) -> bool {
        self.state == ItemState::Open && self.kind.contains("PM")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplaintState {
    Open,
    Closed,
}

/// A complaint tile offered by the work-item wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Complaint {
    pub kind: String,
    pub state: ComplaintState,
}

impl Complaint {
    /// Wizard tiles only list complaints that can still be linked.
    pub fn open(kind: &str) -> Self {
        Self {
            kind: kind.trim().to_string(),
            state: ComplaintState::Open,
        }
    }

    /// Covers "PM - PM" and "PM Hard Hold - PM".
    pub fn is_pm(&self) -> bool {
        self.kind.contains("PM")
    }
}

/// Work items on the vehicle screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    NoOpenItem,
    OpenItem { count: usize },
}

impl VehicleState {
    pub fn classify(items: &[WorkItem]) -> Self {
        match items.iter().filter(|i| i.is_open_pm()).count() {
            0 => Self::NoOpenItem,
            count => Self::OpenItem { count },
        }
    }
}

/// What the controller does with a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Complete the open PM item; the complaint resolver is not involved.
    CompleteOpen,
    /// Start a new work item and resolve its complaint.
    AddWorkItem,
}

pub fn route(state: VehicleState) -> Route {
    match state {
        VehicleState::OpenItem { .. } => Route::CompleteOpen,
        VehicleState::NoOpenItem => Route::AddWorkItem,
    }
}

/// Complaint tiles in the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplaintTiles {
    NoTiles,
    TilesWithoutPm,
    /// `index` is the first PM tile in DOM order.
    PmTileFound { index: usize },
}

impl ComplaintTiles {
    pub fn classify(complaints: &[Complaint]) -> Self {
        if complaints.is_empty() {
            return Self::NoTiles;
        }
        match complaints.iter().position(Complaint::is_pm) {
            Some(index) => Self::PmTileFound { index },
            None => Self::TilesWithoutPm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    CreateNew,
    Associate { index: usize },
}

pub fn plan(tiles: ComplaintTiles) -> Plan {
    match tiles {
        ComplaintTiles::PmTileFound { index } => Plan::Associate { index },
        ComplaintTiles::NoTiles | ComplaintTiles::TilesWithoutPm => Plan::CreateNew,
    }
}

//! In-memory Compass UI for unit tests.
//!
//! Each screen renders a fixed set of nodes, each reachable through the exact
//! [`Locator`] constants in [`selectors`]. Clicks and typing drive a small state
//! machine that mirrors the real app's screens.

use crate::dom::{Dom, ElementHandle, Locator};
use crate::{selectors, Config, Error, Result};
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// Where the Compass Mobile launcher link points.
pub const MOBILE_URL: &str = "https://compass.example/mobile";

/// Default config with test credentials.
pub fn config() -> Config {
    Config::parse(
        r#"{"username": "fleet@example.com", "password": "secret", "login_id": "W123456"}"#,
    )
    .expect("test config parses")
}

/// Opcode tile labels, in DOM order.
pub const OPCODES: [&str; 3] = ["Oil Change", " PM Gas ", "PM Gas Plus"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Blank,
    LoginEmail,
    LoginPassword,
    Kmsi,
    Foundry,
    Wwid,
    Home,
    Vehicle,
    ComplaintSelect,
    Drivability,
    ComplaintType,
    AdditionalInfo,
    Mileage,
    Opcode,
    Review,
    CardOpen,
    CompleteDialog,
}

/// What Compass knows about one MVA.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vehicle {
    /// (title, status) per work-item tile.
    pub work_items: Vec<(String, String)>,
    /// Tile text per complaint offered in the wizard.
    pub complaints: Vec<String>,
}

impl Vehicle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn work_item(mut self, title: &str, status: &str) -> Self {
        self.work_items.push((title.into(), status.into()));
        self
    }

    pub fn complaint(mut self, text: &str) -> Self {
        self.complaints.push(text.into());
        self
    }
}

struct Node {
    id: String,
    text: String,
    locators: Vec<Locator>,
    children: Vec<(Locator, String)>,
    href: Option<String>,
}

impl Node {
    fn new(id: impl Into<String>, text: impl Into<String>, locators: &[Locator]) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            locators: locators.to_vec(),
            children: Vec::new(),
            href: None,
        }
    }

    fn child(mut self, locator: Locator, text: impl Into<String>) -> Self {
        self.children.push((locator, text.into()));
        self
    }
}

struct State {
    screen: Screen,
    vehicles: HashMap<String, Vehicle>,
    current: Option<String>,
    selected_complaint: Option<usize>,
    opened_item: Option<usize>,
    values: HashMap<String, String>,
    url: String,
    authenticated: bool,
    kmsi: bool,
    sticky_dialog: bool,
    blocker: Option<&'static str>,
    hidden: HashSet<String>,
    broken: Vec<Locator>,
    stale: HashMap<String, usize>,
    mangle: HashSet<String>,
    reveal: HashMap<String, usize>,
    queries: usize,
    clicks: Vec<String>,
    gotos: Vec<String>,
}

pub struct FakeCompass {
    state: RefCell<State>,
}

impl FakeCompass {
    pub fn new() -> Self {
        Self::at(Screen::Blank)
    }

    pub fn at(screen: Screen) -> Self {
        Self {
            state: RefCell::new(State {
                screen,
                vehicles: HashMap::new(),
                current: None,
                selected_complaint: None,
                opened_item: None,
                values: HashMap::new(),
                url: "about:blank".into(),
                authenticated: false,
                kmsi: true,
                sticky_dialog: false,
                blocker: None,
                hidden: HashSet::new(),
                broken: Vec::new(),
                stale: HashMap::new(),
                mangle: HashSet::new(),
                reveal: HashMap::new(),
                queries: 0,
                clicks: Vec::new(),
                gotos: Vec::new(),
            }),
        }
    }

    /// Already on the vehicle screen for `mva`.
    pub fn viewing(mva: &str, vehicle: Vehicle) -> Self {
        let fake = Self::at(Screen::Vehicle).with_vehicle(mva, vehicle);
        fake.state.borrow_mut().current = Some(mva.to_string());
        fake
    }

    pub fn with_vehicle(self, mva: &str, vehicle: Vehicle) -> Self {
        self.state
            .borrow_mut()
            .vehicles
            .insert(mva.to_string(), vehicle);
        self
    }

    // --- knobs ---

    /// The sign-in page redirects straight to Foundry.
    pub fn authenticated(&self) {
        self.state.borrow_mut().authenticated = true;
    }

    /// Sign in goes straight to Foundry without the stay-signed-in prompt.
    pub fn skip_kmsi(&self) {
        self.state.borrow_mut().kmsi = false;
    }

    /// The completion dialog stays open after "Complete Work Item".
    pub fn sticky_dialog(&self) {
        self.state.borrow_mut().sticky_dialog = true;
    }

    /// Render the login blocker named `reason` on every screen.
    pub fn show_blocker(&self, reason: &'static str) {
        self.state.borrow_mut().blocker = Some(reason);
    }

    /// Never render the node `id`.
    pub fn hide(&self, id: &str) {
        self.state.borrow_mut().hidden.insert(id.to_string());
    }

    /// Queries for exactly `locator` return nothing.
    pub fn break_locator(&self, locator: &Locator) {
        self.state.borrow_mut().broken.push(locator.clone());
    }

    /// The first click on `id` reports a stale element.
    pub fn stale_once(&self, id: &str) {
        self.stale_times(id, 1);
    }

    /// The first `clicks` clicks on `id` report a stale element.
    pub fn stale_times(&self, id: &str, clicks: usize) {
        self.state.borrow_mut().stale.insert(id.to_string(), clicks);
    }

    /// Switch the current screen, keeping the vehicle in view.
    pub fn show(&self, screen: Screen) {
        self.state.borrow_mut().screen = screen;
    }

    /// Typing into `id` drops the last character.
    pub fn mangle(&self, id: &str) {
        self.state.borrow_mut().mangle.insert(id.to_string());
    }

    /// Keep `id` out of the next `queries` query results.
    pub fn reveal_after(&self, id: &str, queries: usize) {
        self.state
            .borrow_mut()
            .reveal
            .insert(id.to_string(), queries);
    }

    // --- inspection ---

    pub fn screen(&self) -> Screen {
        self.state.borrow().screen
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.borrow().clicks.clone()
    }

    pub fn clicked(&self, id: &str) -> bool {
        self.state.borrow().clicks.iter().any(|c| c == id)
    }

    pub fn gotos(&self) -> Vec<String> {
        self.state.borrow().gotos.clone()
    }

    pub fn queries(&self) -> usize {
        self.state.borrow().queries
    }

    pub fn value_of(&self, id: &str) -> String {
        self.state
            .borrow()
            .values
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn vehicle(&self, mva: &str) -> Vehicle {
        self.state
            .borrow()
            .vehicles
            .get(mva)
            .cloned()
            .unwrap_or_default()
    }

    // --- rendering ---

    fn render(state: &State) -> Vec<Node> {
        let mut nodes = Vec::new();
        let vehicle = state
            .current
            .as_ref()
            .and_then(|mva| state.vehicles.get(mva));

        match state.screen {
            Screen::Blank => {}
            Screen::LoginEmail => {
                nodes.push(Node::new("email", "", &[selectors::LOGIN_EMAIL]));
                nodes.push(Node::new("login-submit", "Next", &[selectors::LOGIN_SUBMIT]));
            }
            Screen::LoginPassword => {
                nodes.push(Node::new("password", "", &[selectors::LOGIN_PASSWORD]));
                nodes.push(Node::new("login-submit", "Sign in", &[selectors::LOGIN_SUBMIT]));
            }
            Screen::Kmsi => {
                nodes.push(Node::new("kmsi-no", "No", &[selectors::KMSI_NO]));
            }
            Screen::Foundry => {
                nodes.push(Node::new("app-shell", "Compass Mobile", &[selectors::APP_SHELL]));
                let mut link = Node::new(
                    "compass-mobile",
                    "Compass Mobile",
                    &[selectors::COMPASS_MOBILE_LINK],
                );
                link.href = Some(MOBILE_URL.to_string());
                nodes.push(link);
            }
            Screen::Wwid => {
                nodes.push(Node::new("wwid", "", &[selectors::WWID_INPUT]));
                nodes.push(Node::new("wwid-submit", "Submit", &[selectors::WWID_SUBMIT]));
            }
            Screen::Home => {
                nodes.push(Node::new("camera", "", &[selectors::CAMERA_BUTTON]));
                nodes.push(Node::new("mva-input", "", &selectors::MVA_INPUTS));
            }
            Screen::Vehicle => {
                nodes.push(Node::new("back", "", &[selectors::BACK_BUTTON]));
                nodes.push(Node::new("properties", "", &[selectors::VEHICLE_PROPERTIES]));
                if let Some(v) = vehicle {
                    for (i, (title, status)) in v.work_items.iter().enumerate() {
                        nodes.push(
                            Node::new(
                                format!("wi-{}", i),
                                format!("{} {}", title, status),
                                &[selectors::WORK_ITEM_TILES],
                            )
                            .child(selectors::WORK_ITEM_TITLE, title.clone())
                            .child(selectors::WORK_ITEM_STATUS, status.clone()),
                        );
                    }
                }
                nodes.push(Node::new(
                    "add-work-item",
                    "Add Work Item",
                    &[selectors::ADD_WORK_ITEM],
                ));
            }
            Screen::ComplaintSelect => {
                nodes.push(Node::new("back", "", &[selectors::BACK_BUTTON]));
                if let Some(v) = vehicle {
                    for (i, text) in v.complaints.iter().enumerate() {
                        nodes.push(
                            Node::new(
                                format!("complaint-{}", i),
                                text.clone(),
                                &[selectors::COMPLAINT_TILES],
                            )
                            .child(selectors::COMPLAINT_TILE_CONTENT, text.clone()),
                        );
                    }
                }
                nodes.push(Node::new(
                    "add-new-complaint",
                    "Add New Complaint",
                    &[selectors::NEW_COMPLAINT[0].clone()],
                ));
                if state.selected_complaint.is_some() {
                    nodes.push(Node::new("next", "Next", &[selectors::NEXT_BUTTON]));
                }
            }
            Screen::Drivability => {
                nodes.push(Node::new("yes", "Yes", &[selectors::DRIVABLE_YES]));
            }
            Screen::ComplaintType => {
                nodes.push(Node::new("type-pm", "PM", &[selectors::COMPLAINT_TYPE_PM]));
            }
            Screen::AdditionalInfo => {
                nodes.push(Node::new(
                    "submit-complaint",
                    "Submit Complaint",
                    &[selectors::SUBMIT_COMPLAINT],
                ));
            }
            Screen::Mileage => {
                nodes.push(Node::new("back", "", &[selectors::BACK_BUTTON]));
                nodes.push(Node::new("next", "Next", &[selectors::NEXT_BUTTON]));
            }
            Screen::Opcode => {
                for (i, label) in OPCODES.iter().enumerate() {
                    nodes.push(
                        Node::new(format!("opcode-{}", i), *label, &[selectors::OPCODE_ITEMS])
                            .child(selectors::OPCODE_TEXT, label.trim()),
                    );
                }
            }
            Screen::Review => {
                nodes.push(Node::new(
                    "create-work-item",
                    "Create Work Item",
                    &[selectors::CREATE_WORK_ITEM],
                ));
            }
            Screen::CardOpen => {
                nodes.push(Node::new("back", "", &[selectors::BACK_BUTTON]));
                nodes.push(Node::new(
                    "mark-complete",
                    "Mark Complete",
                    &selectors::MARK_COMPLETE,
                ));
            }
            Screen::CompleteDialog => {
                nodes.push(Node::new("dialog", "", &[selectors::COMPLETE_DIALOG]));
                nodes.push(Node::new("note", "", &[selectors::COMPLETE_NOTE]));
                nodes.push(Node::new(
                    "complete-work-item",
                    "Complete Work Item",
                    &[selectors::COMPLETE_WORK_ITEM],
                ));
            }
        }

        if let Some(reason) = state.blocker {
            if let Some(b) = selectors::LOGIN_BLOCKERS.iter().find(|b| b.name == reason) {
                nodes.push(Node::new("blocker", reason, &[b.locator.clone()]));
            }
        }

        nodes.retain(|n| !state.hidden.contains(&n.id));
        nodes
    }

    fn handle(node: &Node) -> ElementHandle {
        ElementHandle {
            id: node.id.clone(),
            text: node.text.trim().to_string(),
            visible: true,
            enabled: true,
        }
    }

    /// Run `f` on the rendered node behind `element`, or report it stale.
    fn with_node<T>(&self, element: &ElementHandle, f: impl FnOnce(&Node) -> T) -> Result<T> {
        let state = self.state.borrow();
        Self::render(&state)
            .iter()
            .find(|n| n.id == element.id)
            .map(f)
            .ok_or_else(|| Error::StaleElement(element.id.clone()))
    }

    fn on_click(state: &mut State, id: &str) {
        let current = state.current.clone();
        match (state.screen, id) {
            (Screen::LoginEmail, "login-submit") => {
                if state.values.get("email").is_some_and(|v| !v.is_empty()) {
                    state.screen = Screen::LoginPassword;
                }
            }
            (Screen::LoginPassword, "login-submit") => {
                if state.values.get("password").is_some_and(|v| !v.is_empty()) {
                    state.authenticated = true;
                    state.screen = if state.kmsi {
                        Screen::Kmsi
                    } else {
                        Screen::Foundry
                    };
                }
            }
            (Screen::Kmsi, "kmsi-no") => state.screen = Screen::Foundry,
            (Screen::Wwid, "wwid-submit") => {
                if state.values.get("wwid").is_some_and(|v| !v.is_empty()) {
                    state.screen = Screen::Home;
                }
            }
            (Screen::Vehicle, "back") => {
                state.current = None;
                state.values.remove("mva-input");
                state.screen = Screen::Home;
            }
            (_, "back") => state.screen = Screen::Vehicle,
            (Screen::Vehicle, "add-work-item") => {
                state.selected_complaint = None;
                state.screen = Screen::ComplaintSelect;
            }
            (Screen::Vehicle, tile) if tile.starts_with("wi-") => {
                state.opened_item = tile[3..].parse().ok();
                state.screen = Screen::CardOpen;
            }
            (Screen::ComplaintSelect, tile) if tile.starts_with("complaint-") => {
                state.selected_complaint = tile["complaint-".len()..].parse().ok();
            }
            (Screen::ComplaintSelect, "add-new-complaint") => state.screen = Screen::Drivability,
            (Screen::Drivability, "yes") => state.screen = Screen::ComplaintType,
            (Screen::ComplaintType, "type-pm") => state.screen = Screen::AdditionalInfo,
            (Screen::AdditionalInfo, "submit-complaint") => {
                if let Some(v) = current.and_then(|m| state.vehicles.get_mut(&m)) {
                    v.complaints.push("PM - PM".into());
                    state.selected_complaint = Some(v.complaints.len() - 1);
                }
                state.screen = Screen::ComplaintSelect;
            }
            (Screen::ComplaintSelect, "next") => state.screen = Screen::Mileage,
            (Screen::Mileage, "next") => state.screen = Screen::Opcode,
            (Screen::Opcode, tile) if tile.starts_with("opcode-") => state.screen = Screen::Review,
            (Screen::Review, "create-work-item") => {
                if let Some(v) = current.and_then(|m| state.vehicles.get_mut(&m)) {
                    v.work_items.push(("PM".into(), "Open".into()));
                }
                state.screen = Screen::Vehicle;
            }
            (Screen::CardOpen, "mark-complete") => {
                state.values.remove("note");
                state.screen = Screen::CompleteDialog;
            }
            (Screen::CompleteDialog, "complete-work-item") => {
                let noted = state.values.get("note").is_some_and(|v| !v.is_empty());
                if noted && !state.sticky_dialog {
                    let opened = state.opened_item.take();
                    if let (Some(v), Some(i)) =
                        (current.and_then(|m| state.vehicles.get_mut(&m)), opened)
                    {
                        if let Some(item) = v.work_items.get_mut(i) {
                            item.1 = "Complete".into();
                        }
                    }
                    state.screen = Screen::Vehicle;
                }
            }
            _ => {}
        }
    }

    fn on_typed(state: &mut State, id: &str) {
        if id == "mva-input" && state.screen == Screen::Home {
            let mva = state.values.get(id).cloned().unwrap_or_default();
            if state.vehicles.contains_key(&mva) {
                state.current = Some(mva);
                state.screen = Screen::Vehicle;
            }
        }
    }
}

#[async_trait(?Send)]
impl Dom for FakeCompass {
    async fn query(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let mut state = self.state.borrow_mut();
        state.queries += 1;
        let mut held = HashSet::new();
        for (id, left) in state.reveal.iter_mut() {
            if *left > 0 {
                *left -= 1;
                held.insert(id.clone());
            }
        }
        if state.broken.contains(locator) {
            return Ok(Vec::new());
        }
        Ok(Self::render(&state)
            .iter()
            .filter(|n| !held.contains(&n.id) && n.locators.contains(locator))
            .map(Self::handle)
            .collect())
    }

    async fn child_text(
        &self,
        element: &ElementHandle,
        locator: &Locator,
    ) -> Result<Option<String>> {
        self.with_node(element, |n| {
            n.children
                .iter()
                .find(|(l, _)| l == locator)
                .map(|(_, t)| t.trim().to_string())
        })
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.with_node(element, |_| ())?;
        let mut state = self.state.borrow_mut();
        if let Some(left) = state.stale.get_mut(&element.id) {
            if *left > 0 {
                *left -= 1;
                return Err(Error::StaleElement(element.id.clone()));
            }
        }
        state.clicks.push(element.id.clone());
        Self::on_click(&mut state, &element.id);
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<()> {
        self.with_node(element, |_| ())?;
        self.state.borrow_mut().values.remove(&element.id);
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.with_node(element, |_| ())?;
        let mut state = self.state.borrow_mut();
        let mut typed = text.to_string();
        if state.mangle.contains(&element.id) {
            typed.pop();
        }
        state
            .values
            .entry(element.id.clone())
            .or_default()
            .push_str(&typed);
        Self::on_typed(&mut state, &element.id);
        Ok(())
    }

    async fn value(&self, element: &ElementHandle) -> Result<String> {
        self.with_node(element, |_| ())?;
        Ok(self.value_of(&element.id))
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()> {
        self.with_node(element, |_| ())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        self.with_node(element, |n| match name {
            "href" => n.href.clone(),
            _ => None,
        })
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.gotos.push(url.to_string());
        state.url = url.to_string();
        state.screen = if url == MOBILE_URL {
            Screen::Wwid
        } else if state.authenticated {
            Screen::Foundry
        } else {
            Screen::LoginEmail
        };
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        Ok(self.state.borrow().url.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }
}

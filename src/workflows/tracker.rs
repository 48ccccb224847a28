use serde::{Deserialize, Serialize};
use statig::prelude::*;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::shipments::{Shipment, ShipmentAction, ShipmentState, UnknownState};
use crate::workflows::progress::Progress;

/// Sub-page of the unpacked view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnpackPhase {
    Information,
    Unpack,
    Received,
    Missing,
    Extra,
}

impl UnpackPhase {
    pub const ALL: [UnpackPhase; 5] = [
        UnpackPhase::Information,
        UnpackPhase::Unpack,
        UnpackPhase::Received,
        UnpackPhase::Missing,
        UnpackPhase::Extra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnpackPhase::Information => "information",
            UnpackPhase::Unpack => "unpack",
            UnpackPhase::Received => "received",
            UnpackPhase::Missing => "missing",
            UnpackPhase::Extra => "extra",
        }
    }
}

impl fmt::Display for UnpackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnpackPhase {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnpackPhase::ALL
            .iter()
            .copied()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TrackerError::UnknownPhase(s.to_string()))
    }
}

/// The panel rendered for a shipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShipmentView {
    Loading,
    AddItems,
    Packed,
    Sent,
    Received,
    Unpacked(UnpackPhase),
    Completed,
    Lost,
}

impl ShipmentView {
    pub fn id(&self) -> &'static str {
        match self {
            ShipmentView::Loading => "loading",
            ShipmentView::AddItems => "add-items",
            ShipmentView::Packed => "packed",
            ShipmentView::Sent => "sent",
            ShipmentView::Received => "received",
            ShipmentView::Unpacked(_) => "unpacked",
            ShipmentView::Completed => "completed",
            ShipmentView::Lost => "lost",
        }
    }

    /// Navigation target for this view under the shipping section
    pub fn route(&self, shipment_id: &str) -> String {
        match self {
            ShipmentView::Unpacked(phase) => format!("/shipping/{shipment_id}/unpack/{phase}"),
            other => format!("/shipping/{shipment_id}/{}", other.id()),
        }
    }

    pub fn unpack_phase(&self) -> Option<UnpackPhase> {
        match self {
            ShipmentView::Unpacked(phase) => Some(*phase),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    /// The server sent a state this client does not know; not recoverable
    #[error("fatal: server reported an unsupported shipment state ({0})")]
    UnknownState(String),

    #[error("unknown unpack phase: {0}")]
    UnknownPhase(String),
}

impl From<UnknownState> for TrackerError {
    fn from(err: UnknownState) -> Self {
        TrackerError::UnknownState(err.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerEvent {
    Loaded(ShipmentState),
    SelectPhase(UnpackPhase),
}

/// Context for the view state machine
#[derive(Debug, Default)]
pub struct ViewState {
    loads: u32,
}

#[state_machine(initial = "State::loading()", state(derive(Debug, Clone, PartialEq, Eq)))]
impl ViewState {
    #[state]
    fn loading(&mut self, event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::Loaded(state) => {
                self.loads += 1;
                Transition(view_state_for(*state))
            }
            TrackerEvent::SelectPhase(_) => Handled,
        }
    }

    #[state(superstate = "tracking")]
    fn add_items(event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::Loaded(ShipmentState::Created) => Handled,
            _ => Super,
        }
    }

    #[state(superstate = "tracking")]
    fn packed(event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::Loaded(ShipmentState::Packed) => Handled,
            _ => Super,
        }
    }

    #[state(superstate = "tracking")]
    fn sent(event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::Loaded(ShipmentState::Sent) => Handled,
            _ => Super,
        }
    }

    #[state(superstate = "tracking")]
    fn received(event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::Loaded(ShipmentState::Received) => Handled,
            _ => Super,
        }
    }

    #[state(superstate = "unpacking")]
    fn unpack_information(event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::SelectPhase(UnpackPhase::Information) => Handled,
            _ => Super,
        }
    }

    #[state(superstate = "unpacking")]
    fn unpack_items(event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::SelectPhase(UnpackPhase::Unpack) => Handled,
            _ => Super,
        }
    }

    #[state(superstate = "unpacking")]
    fn unpack_received(event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::SelectPhase(UnpackPhase::Received) => Handled,
            _ => Super,
        }
    }

    #[state(superstate = "unpacking")]
    fn unpack_missing(event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::SelectPhase(UnpackPhase::Missing) => Handled,
            _ => Super,
        }
    }

    #[state(superstate = "unpacking")]
    fn unpack_extra(event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::SelectPhase(UnpackPhase::Extra) => Handled,
            _ => Super,
        }
    }

    #[state(superstate = "tracking")]
    fn completed(event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::Loaded(ShipmentState::Completed) => Handled,
            _ => Super,
        }
    }

    #[state(superstate = "tracking")]
    fn lost(event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::Loaded(ShipmentState::Lost) => Handled,
            _ => Super,
        }
    }

    /// Reloading an unpacked shipment keeps the selected phase
    #[superstate(superstate = "tracking")]
    fn unpacking(event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::Loaded(ShipmentState::Unpacked) => Handled,
            TrackerEvent::SelectPhase(phase) => Transition(phase_state(*phase)),
            _ => Super,
        }
    }

    #[superstate]
    fn tracking(&mut self, event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::Loaded(state) => {
                self.loads += 1;
                tracing::debug!(state = %state, "Workflow view follows new shipment state");
                Transition(view_state_for(*state))
            }
            // phases only exist while unpacked
            TrackerEvent::SelectPhase(_) => Handled,
        }
    }
}

fn view_state_for(state: ShipmentState) -> State {
    match state {
        ShipmentState::Created => State::add_items(),
        ShipmentState::Packed => State::packed(),
        ShipmentState::Sent => State::sent(),
        ShipmentState::Received => State::received(),
        ShipmentState::Unpacked => State::unpack_information(),
        ShipmentState::Completed => State::completed(),
        ShipmentState::Lost => State::lost(),
    }
}

fn phase_state(phase: UnpackPhase) -> State {
    match phase {
        UnpackPhase::Information => State::unpack_information(),
        UnpackPhase::Unpack => State::unpack_items(),
        UnpackPhase::Received => State::unpack_received(),
        UnpackPhase::Missing => State::unpack_missing(),
        UnpackPhase::Extra => State::unpack_extra(),
    }
}

/// Tracks which view and progress bar belong to the shipment being shown.
///
/// The shipment state is the primary key for the view; the unpack phase is a
/// secondary navigation parameter that survives reloads while unpacked.
pub struct WorkflowTracker {
    machine: StateMachine<ViewState>,
    shipment_state: Option<ShipmentState>,
    progress: Option<Progress>,
}

impl Default for WorkflowTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WorkflowTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowTracker")
            .field("view", &self.view())
            .field("shipment_state", &self.shipment_state)
            .finish()
    }
}

impl WorkflowTracker {
    pub fn new() -> Self {
        Self {
            machine: ViewState::default().state_machine(),
            shipment_state: None,
            progress: None,
        }
    }

    pub fn for_shipment(shipment: &Shipment) -> Self {
        let mut tracker = Self::new();
        tracker.load(shipment);
        tracker
    }

    pub fn load(&mut self, shipment: &Shipment) {
        self.machine.handle(&TrackerEvent::Loaded(shipment.state));
        self.shipment_state = Some(shipment.state);
        self.progress = Some(Progress::for_shipment(shipment));
    }

    /// Load from a raw state name; an unrecognised name is fatal.
    pub fn load_state_name(&mut self, state: &str) -> Result<ShipmentView, TrackerError> {
        let state: ShipmentState = state.parse()?;
        self.machine.handle(&TrackerEvent::Loaded(state));
        self.shipment_state = Some(state);
        self.progress = Some(Progress::for_state(state));
        Ok(self.view())
    }

    /// Switch the unpack sub-page; ignored unless the shipment is unpacked
    pub fn select_phase(&mut self, phase: UnpackPhase) -> ShipmentView {
        self.machine.handle(&TrackerEvent::SelectPhase(phase));
        self.view()
    }

    pub fn view(&self) -> ShipmentView {
        match self.machine.state() {
            State::Loading { .. } => ShipmentView::Loading,
            State::AddItems { .. } => ShipmentView::AddItems,
            State::Packed { .. } => ShipmentView::Packed,
            State::Sent { .. } => ShipmentView::Sent,
            State::Received { .. } => ShipmentView::Received,
            State::UnpackInformation { .. } => ShipmentView::Unpacked(UnpackPhase::Information),
            State::UnpackItems { .. } => ShipmentView::Unpacked(UnpackPhase::Unpack),
            State::UnpackReceived { .. } => ShipmentView::Unpacked(UnpackPhase::Received),
            State::UnpackMissing { .. } => ShipmentView::Unpacked(UnpackPhase::Missing),
            State::UnpackExtra { .. } => ShipmentView::Unpacked(UnpackPhase::Extra),
            State::Completed { .. } => ShipmentView::Completed,
            State::Lost { .. } => ShipmentView::Lost,
        }
    }

    pub fn shipment_state(&self) -> Option<ShipmentState> {
        self.shipment_state
    }

    pub fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    /// Action buttons to enable; empty for terminal states and before loading
    pub fn available_actions(&self) -> Vec<ShipmentAction> {
        self.shipment_state
            .map(|state| state.available_actions())
            .unwrap_or_default()
    }

    pub fn loads(&self) -> u32 {
        self.machine.inner().loads
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shipments::errors::{DomainViolation, ShipmentError};

/// Lifecycle state of a shipment as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentState {
    Created,
    Packed,
    Sent,
    Received,
    Unpacked,
    Completed,
    Lost,
}

impl ShipmentState {
    pub const ALL: [ShipmentState; 7] = [
        ShipmentState::Created,
        ShipmentState::Packed,
        ShipmentState::Sent,
        ShipmentState::Received,
        ShipmentState::Unpacked,
        ShipmentState::Completed,
        ShipmentState::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentState::Created => "created",
            ShipmentState::Packed => "packed",
            ShipmentState::Sent => "sent",
            ShipmentState::Received => "received",
            ShipmentState::Unpacked => "unpacked",
            ShipmentState::Completed => "completed",
            ShipmentState::Lost => "lost",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentState::Completed | ShipmentState::Lost)
    }

    /// Actions an operator may take from this state, in display order
    pub fn available_actions(&self) -> Vec<ShipmentAction> {
        ShipmentAction::ALL
            .iter()
            .copied()
            .filter(|action| action.is_allowed_from(*self))
            .collect()
    }
}

impl fmt::Display for ShipmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown shipment state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for ShipmentState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShipmentState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

/// A lifecycle transition the operator can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipmentAction {
    /// Reopen a packed or sent shipment so more items can be added
    Reopen,
    Pack,
    Send,
    Receive,
    Unpack,
    Complete,
    Lose,
}

impl ShipmentAction {
    pub const ALL: [ShipmentAction; 7] = [
        ShipmentAction::Reopen,
        ShipmentAction::Pack,
        ShipmentAction::Send,
        ShipmentAction::Receive,
        ShipmentAction::Unpack,
        ShipmentAction::Complete,
        ShipmentAction::Lose,
    ];

    pub fn target_state(&self) -> ShipmentState {
        match self {
            ShipmentAction::Reopen => ShipmentState::Created,
            ShipmentAction::Pack => ShipmentState::Packed,
            ShipmentAction::Send => ShipmentState::Sent,
            ShipmentAction::Receive => ShipmentState::Received,
            ShipmentAction::Unpack => ShipmentState::Unpacked,
            ShipmentAction::Complete => ShipmentState::Completed,
            ShipmentAction::Lose => ShipmentState::Lost,
        }
    }

    pub fn is_allowed_from(&self, state: ShipmentState) -> bool {
        use ShipmentState::*;
        match self {
            ShipmentAction::Reopen => matches!(state, Packed | Sent),
            ShipmentAction::Pack => state == Created,
            ShipmentAction::Send => state == Packed,
            ShipmentAction::Receive => state == Sent,
            ShipmentAction::Unpack => state == Received,
            ShipmentAction::Complete => state == Unpacked,
            ShipmentAction::Lose => !state.is_terminal(),
        }
    }

    /// Whether the server expects a timestamp with this transition
    pub fn takes_time(&self) -> bool {
        !matches!(self, ShipmentAction::Reopen | ShipmentAction::Lose)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ShipmentAction::Reopen => "reopen",
            ShipmentAction::Pack => "pack",
            ShipmentAction::Send => "send",
            ShipmentAction::Receive => "receive",
            ShipmentAction::Unpack => "unpack",
            ShipmentAction::Complete => "complete",
            ShipmentAction::Lose => "lose",
        }
    }
}

impl fmt::Display for ShipmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-specimen status inside a shipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Present,
    Received,
    Missing,
    Extra,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Present => "present",
            ItemState::Received => "received",
            ItemState::Missing => "missing",
            ItemState::Extra => "extra",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemState {
    type Err = ShipmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(ItemState::Present),
            "received" => Ok(ItemState::Received),
            "missing" => Ok(ItemState::Missing),
            "extra" => Ok(ItemState::Extra),
            other => Err(ShipmentError::InvalidInput(format!(
                "unknown item state: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub location_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: String,
    pub version: u64,
    pub time_added: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_modified: Option<DateTime<Utc>>,
    pub state: ShipmentState,
    pub courier_name: String,
    pub tracking_number: String,
    #[serde(rename = "fromLocationInfo")]
    pub from_location: LocationInfo,
    #[serde(rename = "toLocationInfo")]
    pub to_location: LocationInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_packed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_sent: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_received: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_unpacked: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_completed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub specimen_count: u32,
}

impl Shipment {
    /// The command that would recreate this shipment on the server
    pub fn add_command(&self) -> AddShipment {
        AddShipment {
            courier_name: self.courier_name.clone(),
            tracking_number: self.tracking_number.clone(),
            from_location_id: self.from_location.location_id.clone(),
            to_location_id: self.to_location.location_id.clone(),
        }
    }

    /// Timestamp recorded when the shipment entered `state`
    pub fn time_for(&self, state: ShipmentState) -> Option<DateTime<Utc>> {
        match state {
            ShipmentState::Created => Some(self.time_added),
            ShipmentState::Packed => self.time_packed,
            ShipmentState::Sent => self.time_sent,
            ShipmentState::Received => self.time_received,
            ShipmentState::Unpacked => self.time_unpacked,
            ShipmentState::Completed => self.time_completed,
            ShipmentState::Lost => None,
        }
    }

    /// Check that `time` does not precede the timestamp the action builds on.
    pub fn check_time_order(
        &self,
        action: ShipmentAction,
        time: DateTime<Utc>,
    ) -> Result<(), DomainViolation> {
        let (previous, violation) = match action {
            ShipmentAction::Send => (self.time_packed, DomainViolation::TimeSentBeforePacked),
            ShipmentAction::Receive => (self.time_sent, DomainViolation::TimeReceivedBeforeSent),
            ShipmentAction::Unpack => (
                self.time_received,
                DomainViolation::TimeUnpackedBeforeReceived,
            ),
            ShipmentAction::Complete => (
                self.time_unpacked,
                DomainViolation::TimeCompletedBeforeUnpacked,
            ),
            _ => return Ok(()),
        };

        match previous {
            Some(previous) if time < previous => Err(violation),
            _ => Ok(()),
        }
    }
}

/// Body of the "add shipment" request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddShipment {
    pub courier_name: String,
    pub tracking_number: String,
    pub from_location_id: String,
    pub to_location_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentSpecimen {
    pub id: String,
    pub version: u64,
    pub shipment_id: String,
    pub specimen_id: String,
    pub inventory_id: String,
    pub state: ItemState,
    #[serde(default)]
    pub location_name: Option<String>,
    pub time_added: DateTime<Utc>,
}

/// One page of a server-side paged listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub offset: u32,
    pub total: u32,
}

impl<T> PagedResult<T> {
    pub fn has_next(&self) -> bool {
        let shown = u32::try_from(self.items.len()).unwrap_or(u32::MAX);
        self.offset.saturating_add(shown) < self.total
    }
}

/// Split an operator-entered inventory id list on commas and whitespace.
pub fn parse_inventory_ids(input: &str) -> Vec<String> {
    static SEPARATOR: std::sync::LazyLock<regex::Regex> =
        std::sync::LazyLock::new(|| regex::Regex::new(r"[,\s]+").expect("valid separator regex"));

    SEPARATOR
        .split(input)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

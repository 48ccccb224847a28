use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use crate::shipments::{Shipment, ShipmentAction, ShipmentError, ShipmentState, TrackedShipment};

/// Where an operator can jump to when handling already happened out of band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipTarget {
    /// Created → Sent, recording packed and sent times
    Sent,
    /// Sent → Unpacked, recording received and unpacked times
    Unpacked,
}

impl SkipTarget {
    /// The skip offered for a shipment in `state`, if any
    pub fn for_state(state: ShipmentState) -> Option<Self> {
        match state {
            ShipmentState::Created => Some(SkipTarget::Sent),
            ShipmentState::Sent => Some(SkipTarget::Unpacked),
            _ => None,
        }
    }

    pub fn from_state(&self) -> ShipmentState {
        match self {
            SkipTarget::Sent => ShipmentState::Created,
            SkipTarget::Unpacked => ShipmentState::Sent,
        }
    }

    pub fn to_state(&self) -> ShipmentState {
        match self {
            SkipTarget::Sent => ShipmentState::Sent,
            SkipTarget::Unpacked => ShipmentState::Unpacked,
        }
    }

    pub fn steps(&self) -> [ShipmentAction; 2] {
        match self {
            SkipTarget::Sent => [ShipmentAction::Pack, ShipmentAction::Send],
            SkipTarget::Unpacked => [ShipmentAction::Receive, ShipmentAction::Unpack],
        }
    }

    /// Labels of the two timestamps the dialog collects
    pub fn time_labels(&self) -> [&'static str; 2] {
        match self {
            SkipTarget::Sent => ["Time packed", "Time sent"],
            SkipTarget::Unpacked => ["Time received", "Time unpacked"],
        }
    }
}

impl fmt::Display for SkipTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_state())
    }
}

/// The confirmed contents of a skip dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipRequest {
    pub target: SkipTarget,
    pub first_time: DateTime<Utc>,
    pub second_time: DateTime<Utc>,
}

impl SkipRequest {
    pub fn steps(&self) -> [(ShipmentAction, DateTime<Utc>); 2] {
        let [first, second] = self.target.steps();
        [(first, self.first_time), (second, self.second_time)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Confirmed(SkipRequest),
    Cancelled,
}

/// Collects the timestamps a skip would otherwise record one step at a time
#[derive(Debug, Clone)]
pub struct SkipDialog {
    shipment: Shipment,
    target: SkipTarget,
    first_time: Option<DateTime<Utc>>,
    second_time: Option<DateTime<Utc>>,
}

impl SkipDialog {
    pub fn open(shipment: &Shipment, target: SkipTarget) -> Result<Self, ShipmentError> {
        let state = shipment.state;
        if state.is_terminal() {
            return Err(ShipmentError::Terminal { state });
        }
        if state != target.from_state() {
            return Err(ShipmentError::NotAllowed {
                operation: match target {
                    SkipTarget::Sent => "skip to sent",
                    SkipTarget::Unpacked => "skip to unpacked",
                },
                state,
            });
        }
        Ok(Self {
            shipment: shipment.clone(),
            target,
            first_time: None,
            second_time: None,
        })
    }

    pub fn target(&self) -> SkipTarget {
        self.target
    }

    pub fn set_first_time(&mut self, time: DateTime<Utc>) -> &mut Self {
        self.first_time = Some(time);
        self
    }

    pub fn set_second_time(&mut self, time: DateTime<Utc>) -> &mut Self {
        self.second_time = Some(time);
        self
    }

    /// Validate both times against each other and the recorded history.
    pub fn confirm(self) -> Result<DialogOutcome, ShipmentError> {
        let [first_label, second_label] = self.target.time_labels();
        let first_time = self
            .first_time
            .ok_or_else(|| ShipmentError::InvalidInput(format!("{first_label} is required")))?;
        let second_time = self
            .second_time
            .ok_or_else(|| ShipmentError::InvalidInput(format!("{second_label} is required")))?;

        let [first_action, second_action] = self.target.steps();
        self.shipment.check_time_order(first_action, first_time)?;

        let mut projected = self.shipment;
        match self.target {
            SkipTarget::Sent => projected.time_packed = Some(first_time),
            SkipTarget::Unpacked => projected.time_received = Some(first_time),
        }
        projected.check_time_order(second_action, second_time)?;

        Ok(DialogOutcome::Confirmed(SkipRequest {
            target: self.target,
            first_time,
            second_time,
        }))
    }

    pub fn cancel(self) -> DialogOutcome {
        DialogOutcome::Cancelled
    }
}

/// A skip that stopped part way; the shipment stays where the last
/// successful step left it.
#[derive(Debug, Error)]
#[error("skip to {target} stopped at {failed} (shipment is {reached}): {source}")]
pub struct SkipError {
    pub target: SkipTarget,
    pub completed: Vec<ShipmentAction>,
    pub failed: ShipmentAction,
    pub reached: ShipmentState,
    #[source]
    pub source: ShipmentError,
}

impl SkipError {
    /// Names the steps that were recorded, the one that failed and where the
    /// shipment was left.
    pub fn user_message(&self) -> String {
        let mut parts: Vec<String> = self
            .completed
            .iter()
            .map(|action| format!("{action} recorded"))
            .collect();
        parts.push(format!("{} failed: {}", self.failed, self.source.user_message()));
        parts.push(format!("shipment is {}", self.reached));
        parts.join("; ")
    }
}

/// Apply both steps of `request` in order, stopping at the first failure.
pub async fn skip_to_state<'a>(
    shipment: &'a mut TrackedShipment,
    request: &SkipRequest,
) -> Result<&'a Shipment, SkipError> {
    let mut completed = Vec::new();

    for (action, time) in request.steps() {
        let outcome = shipment.apply(action, Some(time)).await.map(|_| ());
        if let Err(source) = outcome {
            let reached = shipment.state();
            warn!(
                shipment_id = %shipment.id(),
                target = %request.target,
                failed = %action,
                reached = %reached,
                "Skip stopped before reaching its target"
            );
            return Err(SkipError {
                target: request.target,
                completed,
                failed: action,
                reached,
                source,
            });
        }
        completed.push(action);
    }

    info!(shipment_id = %shipment.id(), target = %request.target, "Shipment skipped ahead");
    Ok(shipment.shipment())
}

use serde::Serialize;
use std::fmt;

use crate::shipments::{Shipment, ShipmentState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Done,
    Current,
    Todo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressStep {
    pub label: &'static str,
    pub state: ShipmentState,
    pub status: StepStatus,
}

/// Progress-bar contents for one shipment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub steps: Vec<ProgressStep>,
    pub lost: bool,
}

const STEPS: [(ShipmentState, &str); 6] = [
    (ShipmentState::Created, "Created"),
    (ShipmentState::Packed, "Packed"),
    (ShipmentState::Sent, "Sent"),
    (ShipmentState::Received, "Received"),
    (ShipmentState::Unpacked, "Unpacked"),
    (ShipmentState::Completed, "Completed"),
];

impl Progress {
    /// Steps before `state` are done, its own step is current.
    ///
    /// A completed shipment has every step done. A lost shipment only knows it
    /// was created; use [`Progress::for_shipment`] to recover the rest.
    pub fn for_state(state: ShipmentState) -> Self {
        match state {
            ShipmentState::Lost => Self::from_fn(true, |step| {
                if step == ShipmentState::Created {
                    StepStatus::Done
                } else {
                    StepStatus::Todo
                }
            }),
            ShipmentState::Completed => Self::from_fn(false, |_| StepStatus::Done),
            current => {
                let current_index = position(current);
                Self::from_fn(false, |step| match position(step).cmp(&current_index) {
                    std::cmp::Ordering::Less => StepStatus::Done,
                    std::cmp::Ordering::Equal => StepStatus::Current,
                    std::cmp::Ordering::Greater => StepStatus::Todo,
                })
            }
        }
    }

    /// Like [`Progress::for_state`], but a lost shipment shows every step it
    /// has a recorded time for as done.
    pub fn for_shipment(shipment: &Shipment) -> Self {
        if shipment.state != ShipmentState::Lost {
            return Self::for_state(shipment.state);
        }
        Self::from_fn(true, |step| {
            if shipment.time_for(step).is_some() {
                StepStatus::Done
            } else {
                StepStatus::Todo
            }
        })
    }

    fn from_fn(lost: bool, status: impl Fn(ShipmentState) -> StepStatus) -> Self {
        Self {
            steps: STEPS
                .iter()
                .map(|(state, label)| ProgressStep {
                    label: *label,
                    state: *state,
                    status: status(*state),
                })
                .collect(),
            lost,
        }
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|step| step.status == status).count()
    }

    pub fn current(&self) -> Option<&ProgressStep> {
        self.steps.iter().find(|step| step.status == StepStatus::Current)
    }
}

fn position(state: ShipmentState) -> usize {
    STEPS
        .iter()
        .position(|(step, _)| *step == state)
        .unwrap_or(STEPS.len())
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .steps
            .iter()
            .map(|step| {
                let marker = match step.status {
                    StepStatus::Done => "✓",
                    StepStatus::Current => "●",
                    StepStatus::Todo => "○",
                };
                format!("{marker} {}", step.label)
            })
            .collect();
        write!(f, "{}", rendered.join(" → "))?;
        if self.lost {
            write!(f, "  ✗ Lost")?;
        }
        Ok(())
    }
}

use thiserror::Error;

use crate::api::ApiError;
use crate::shipments::types::{ShipmentAction, ShipmentState};

/// Timestamp ordering rules the server and client both enforce.
///
/// The `Display` form is the message code the server uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DomainViolation {
    #[error("TimeSentBeforePacked")]
    TimeSentBeforePacked,
    #[error("TimeReceivedBeforeSent")]
    TimeReceivedBeforeSent,
    #[error("TimeUnpackedBeforeReceived")]
    TimeUnpackedBeforeReceived,
    #[error("TimeCompletedBeforeUnpacked")]
    TimeCompletedBeforeUnpacked,
}

impl DomainViolation {
    const ALL: [DomainViolation; 4] = [
        DomainViolation::TimeSentBeforePacked,
        DomainViolation::TimeReceivedBeforeSent,
        DomainViolation::TimeUnpackedBeforeReceived,
        DomainViolation::TimeCompletedBeforeUnpacked,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            DomainViolation::TimeSentBeforePacked => "TimeSentBeforePacked",
            DomainViolation::TimeReceivedBeforeSent => "TimeReceivedBeforeSent",
            DomainViolation::TimeUnpackedBeforeReceived => "TimeUnpackedBeforeReceived",
            DomainViolation::TimeCompletedBeforeUnpacked => "TimeCompletedBeforeUnpacked",
        }
    }

    /// Recognise a code inside a server error message such as
    /// `"EntityCriteriaError: TimeSentBeforePacked"`.
    pub fn from_message(message: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|violation| message.contains(violation.code()))
    }

    /// Operator-facing wording, only for codes that have one
    pub fn friendly_message(&self) -> Option<&'static str> {
        match self {
            DomainViolation::TimeSentBeforePacked => {
                Some("The sent time is before the packed time. Please correct the sent time.")
            }
            DomainViolation::TimeUnpackedBeforeReceived => Some(
                "The unpacked time is before the received time. Please correct the unpacked time.",
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ShipmentError {
    #[error("{0}")]
    Domain(DomainViolation),

    #[error("cannot {action} a shipment that is {state}")]
    InvalidTransition {
        action: ShipmentAction,
        state: ShipmentState,
    },

    #[error("cannot {operation} while the shipment is {state}")]
    NotAllowed {
        operation: &'static str,
        state: ShipmentState,
    },

    #[error("shipment is {state} and can no longer change")]
    Terminal { state: ShipmentState },

    #[error("{count} item(s) in the shipment are still present")]
    ItemsStillPresent { count: u32 },

    #[error("a transition for shipment {shipment_id} is already in progress")]
    TransitionInProgress { shipment_id: String },

    #[error("shipment was modified by another user: {message}")]
    VersionConflict { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error("{message}")]
    Server { message: String },

    /// Unrecognised state or payload shape; the client and server disagree
    #[error("protocol mismatch with server: {0}")]
    Protocol(String),

    #[error(transparent)]
    Transport(ApiError),
}

impl ShipmentError {
    /// Text shown to the operator. The two known timestamp codes get friendly
    /// wording; every other server message is passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ShipmentError::Domain(violation) => violation
                .friendly_message()
                .map(str::to_string)
                .unwrap_or_else(|| violation.code().to_string()),
            other => other.to_string(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ShipmentError::Protocol(_))
    }
}

impl From<DomainViolation> for ShipmentError {
    fn from(violation: DomainViolation) -> Self {
        ShipmentError::Domain(violation)
    }
}

impl From<ApiError> for ShipmentError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Server { message, .. } => match DomainViolation::from_message(&message) {
                Some(violation) => ShipmentError::Domain(violation),
                None => ShipmentError::Server { message },
            },
            ApiError::VersionConflict { message } => ShipmentError::VersionConflict { message },
            ApiError::NotFound { message } => ShipmentError::NotFound { message },
            ApiError::Decode(message) => ShipmentError::Protocol(message),
            transport @ ApiError::Transport { .. } => ShipmentError::Transport(transport),
        }
    }
}

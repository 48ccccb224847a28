// Workflow views, skip dialogs and the per-shipment controller

pub mod controller;
pub mod notify;
pub mod progress;
pub mod skip;
pub mod tracker;

pub use controller::{ActionOutcome, ShipmentController, UserAction};
pub use notify::{
    notification_for, skip_notification, ConsoleNotifier, Notification, Notifier, RecordingNotifier,
};
pub use progress::{Progress, ProgressStep, StepStatus};
pub use skip::{skip_to_state, DialogOutcome, SkipDialog, SkipError, SkipRequest, SkipTarget};
pub use tracker::{ShipmentView, TrackerError, UnpackPhase, WorkflowTracker};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, Instrument};

use crate::api::{ShipmentApi, ShipmentUpdate};
use crate::observability::OperationTimer;
use crate::session::SessionContext;
use crate::shipments::{
    InFlightRegistry, ItemState, Shipment, ShipmentAction, ShipmentError, TrackedShipment,
};
use crate::workflows::notify::{notification_for, skip_notification, Notification, Notifier};
use crate::workflows::skip::{skip_to_state, DialogOutcome, SkipDialog, SkipTarget};
use crate::workflows::tracker::{ShipmentView, UnpackPhase, WorkflowTracker};

/// Something the operator did on the shipment page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Transition {
        action: ShipmentAction,
        time: Option<DateTime<Utc>>,
    },
    Skip(DialogOutcome),
    TagSpecimens {
        item_state: ItemState,
        inventory_ids: String,
    },
    AddSpecimens(String),
    Edit(ShipmentUpdate),
    SelectPhase(UnpackPhase),
    Reload,
}

impl UserAction {
    fn name(&self) -> &'static str {
        match self {
            UserAction::Transition { action, .. } => action.label(),
            UserAction::Skip(_) => "skip",
            UserAction::TagSpecimens { .. } => "tag specimens",
            UserAction::AddSpecimens(_) => "add specimens",
            UserAction::Edit(_) => "edit",
            UserAction::SelectPhase(_) => "select phase",
            UserAction::Reload => "reload",
        }
    }

    /// Read-only navigation stays available on terminal shipments
    fn mutates(&self) -> bool {
        !matches!(self, UserAction::SelectPhase(_) | UserAction::Reload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Cancelled,
    /// The shipment is terminal; nothing was sent
    Disabled,
    Failed(Notification),
}

/// Drives one shipment page: the entity, its view and operator feedback.
pub struct ShipmentController<N: Notifier> {
    session: SessionContext,
    shipment: TrackedShipment,
    tracker: WorkflowTracker,
    notifier: N,
}

impl<N: Notifier> std::fmt::Debug for ShipmentController<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShipmentController")
            .field("session", &self.session)
            .field("shipment", &self.shipment)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl<N: Notifier> ShipmentController<N> {
    pub fn new(session: SessionContext, shipment: TrackedShipment, notifier: N) -> Self {
        let tracker = WorkflowTracker::for_shipment(shipment.shipment());
        Self {
            session,
            shipment,
            tracker,
            notifier,
        }
    }

    /// Fetch a shipment and build its page
    pub async fn open(
        session: SessionContext,
        api: Arc<dyn ShipmentApi>,
        in_flight: InFlightRegistry,
        shipment_id: &str,
        notifier: N,
    ) -> Result<Self, ShipmentError> {
        let span = session.span("open", Some(shipment_id));
        let shipment = TrackedShipment::load(api, in_flight, shipment_id)
            .instrument(span)
            .await?;
        Ok(Self::new(session, shipment, notifier))
    }

    pub fn shipment(&self) -> &Shipment {
        self.shipment.shipment()
    }

    pub fn tracked(&self) -> &TrackedShipment {
        &self.shipment
    }

    pub fn tracker(&self) -> &WorkflowTracker {
        &self.tracker
    }

    pub fn view(&self) -> ShipmentView {
        self.tracker.view()
    }

    pub fn route(&self) -> String {
        self.tracker.view().route(self.shipment.id())
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Open the skip dialog offered for the current state, if any
    pub fn open_skip_dialog(&self) -> Result<SkipDialog, ShipmentError> {
        let shipment = self.shipment.shipment();
        let target = SkipTarget::for_state(shipment.state).ok_or(ShipmentError::NotAllowed {
            operation: "skip ahead",
            state: shipment.state,
        })?;
        SkipDialog::open(shipment, target)
    }

    /// Run one operator action.
    ///
    /// Recoverable failures are reported through the notifier and returned as
    /// [`ActionOutcome::Failed`]; only protocol mismatches come back as `Err`.
    pub async fn dispatch(&mut self, action: UserAction) -> Result<ActionOutcome, ShipmentError> {
        let span = self.session.span(action.name(), Some(self.shipment.id()));
        let timer = OperationTimer::new(action.name());
        let outcome = self.run(action).instrument(span).await;
        timer.finish();
        outcome
    }

    async fn run(&mut self, action: UserAction) -> Result<ActionOutcome, ShipmentError> {
        if action.mutates() && self.shipment.state().is_terminal() {
            debug!(state = %self.shipment.state(), action = action.name(), "Action disabled");
            return Ok(ActionOutcome::Disabled);
        }

        let name = action.name();
        let result = match action {
            UserAction::Transition { action, time } => self
                .shipment
                .apply(action, time)
                .await
                .map(|shipment| format!("Shipment is now {}", shipment.state)),
            UserAction::Skip(DialogOutcome::Cancelled) => return Ok(ActionOutcome::Cancelled),
            UserAction::Skip(DialogOutcome::Confirmed(request)) => {
                let reached = skip_to_state(&mut self.shipment, &request)
                    .await
                    .map(|shipment| shipment.state);
                match reached {
                    Ok(state) => Ok(format!("Shipment is now {state}")),
                    Err(err) if err.source.is_fatal() => return Err(err.source),
                    Err(err) => {
                        // keep the view on whatever step was reached
                        self.tracker.load(self.shipment.shipment());
                        let notification = skip_notification(&err);
                        self.notifier.notify(notification.clone());
                        return Ok(ActionOutcome::Failed(notification));
                    }
                }
            }
            UserAction::TagSpecimens {
                item_state,
                inventory_ids,
            } => self
                .shipment
                .tag_specimens(item_state, &inventory_ids)
                .await
                .map(|_| format!("Specimens tagged as {item_state}")),
            UserAction::AddSpecimens(inventory_ids) => self
                .shipment
                .add_specimens(&inventory_ids)
                .await
                .map(|shipment| format!("Shipment now holds {} specimen(s)", shipment.specimen_count)),
            UserAction::Edit(update) => self
                .shipment
                .update(update)
                .await
                .map(|_| "Shipping information updated".to_string()),
            UserAction::SelectPhase(phase) => {
                self.tracker.select_phase(phase);
                return Ok(ActionOutcome::Applied);
            }
            UserAction::Reload => self
                .shipment
                .reload()
                .await
                .map(|shipment| format!("Shipment {} reloaded", shipment.id)),
        };

        match result {
            Ok(message) => {
                self.tracker.load(self.shipment.shipment());
                self.notifier.notify(Notification::success(message));
                Ok(ActionOutcome::Applied)
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                let notification = notification_for(&err, &capitalize(name));
                self.notifier.notify(notification.clone());
                Ok(ActionOutcome::Failed(notification))
            }
        }
    }

    /// Delete the shipment; only possible before it is packed
    pub async fn remove(self) -> Result<(), ShipmentError> {
        let span = self.session.span("remove", Some(self.shipment.id()));
        let notifier = self.notifier;
        match self.shipment.remove().instrument(span).await {
            Ok(()) => {
                notifier.notify(Notification::success("Shipment removed"));
                Ok(())
            }
            Err(err) => {
                notifier.notify(notification_for(&err, "Remove"));
                Err(err)
            }
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

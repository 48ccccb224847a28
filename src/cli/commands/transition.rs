use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use crate::cli::commands::{finish, with_controller, CommandContext};
use crate::shipments::ShipmentAction;
use crate::workflows::UserAction;

/// pack, send, receive, unpack, complete, lose and reopen
pub struct TransitionCommand {
    pub shipment_id: String,
    pub action: ShipmentAction,
    pub time: Option<DateTime<Utc>>,
}

impl TransitionCommand {
    pub fn new(shipment_id: impl Into<String>, action: ShipmentAction) -> Self {
        Self {
            shipment_id: shipment_id.into(),
            action,
            time: None,
        }
    }

    pub fn at(mut self, time: Option<DateTime<Utc>>) -> Self {
        self.time = time;
        self
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let action = self.action;
        let time = self.time;
        with_controller(ctx, &self.shipment_id, |mut controller| async move {
            if !controller.tracker().available_actions().contains(&action) {
                let shipment = controller.shipment();
                bail!("Cannot {} shipment {}: it is {}", action.label(), shipment.id, shipment.state);
            }
            let outcome = controller
                .dispatch(UserAction::Transition { action, time })
                .await?;
            finish(outcome)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShippingConfig;
    use crate::shipments::mocks::{shipment_in, ApiCall, FakeShipmentApi};
    use crate::shipments::ShipmentState;
    use std::sync::Arc;

    fn context_with(api: &Arc<FakeShipmentApi>) -> CommandContext {
        let mut ctx = CommandContext::new(ShippingConfig::default()).unwrap();
        ctx.api = api.clone();
        ctx
    }

    #[tokio::test]
    async fn test_unavailable_action_is_refused_without_dispatch() {
        let api = Arc::new(FakeShipmentApi::new());
        let shipment = shipment_in(ShipmentState::Created);
        api.insert(shipment.clone());
        let ctx = context_with(&api);

        let err = TransitionCommand::new(shipment.id.clone(), ShipmentAction::Send)
            .execute(&ctx)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Cannot send shipment {}: it is created", shipment.id)
        );
        assert_eq!(api.calls(), vec![ApiCall::Get(shipment.id.clone())]);
    }

    #[tokio::test]
    async fn test_available_action_is_applied() {
        let api = Arc::new(FakeShipmentApi::new());
        let shipment = shipment_in(ShipmentState::Created);
        api.insert(shipment.clone());
        let ctx = context_with(&api);

        TransitionCommand::new(shipment.id.clone(), ShipmentAction::Pack)
            .execute(&ctx)
            .await
            .unwrap();
        assert_eq!(api.state_changes(), vec![ShipmentState::Packed]);
    }
}

use anyhow::{bail, Result};

use crate::api::ShipmentUpdate;
use crate::cli::commands::{finish, with_controller, CommandContext};
use crate::workflows::{ActionOutcome, UserAction};

pub struct EditCommand {
    pub shipment_id: String,
    pub updates: Vec<ShipmentUpdate>,
}

impl EditCommand {
    pub fn new(shipment_id: impl Into<String>) -> Self {
        Self {
            shipment_id: shipment_id.into(),
            updates: Vec::new(),
        }
    }

    pub fn courier(mut self, name: Option<String>) -> Self {
        if let Some(name) = name {
            self.updates.push(ShipmentUpdate::CourierName(name.trim().to_string()));
        }
        self
    }

    pub fn tracking(mut self, number: Option<String>) -> Self {
        if let Some(number) = number {
            self.updates.push(ShipmentUpdate::TrackingNumber(number.trim().to_string()));
        }
        self
    }

    pub fn from_location(mut self, location_id: Option<String>) -> Self {
        if let Some(location_id) = location_id {
            self.updates.push(ShipmentUpdate::FromLocation(location_id));
        }
        self
    }

    pub fn to_location(mut self, location_id: Option<String>) -> Self {
        if let Some(location_id) = location_id {
            self.updates.push(ShipmentUpdate::ToLocation(location_id));
        }
        self
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        if self.updates.is_empty() {
            println!("⚠️  Nothing to change: pass --courier, --tracking, --from or --to");
            bail!("no changes requested");
        }

        with_controller(ctx, &self.shipment_id, |mut controller| async move {
            // each edit bumps the version, so they go one at a time
            for update in &self.updates {
                let outcome = controller.dispatch(UserAction::Edit(update.clone())).await?;
                if outcome != ActionOutcome::Applied {
                    return finish(outcome);
                }
            }
            Ok(())
        })
        .await
    }
}

pub struct RemoveCommand {
    pub shipment_id: String,
}

impl RemoveCommand {
    pub fn new(shipment_id: impl Into<String>) -> Self {
        Self {
            shipment_id: shipment_id.into(),
        }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        with_controller(ctx, &self.shipment_id, |controller| async move {
            controller.remove().await?;
            Ok(())
        })
        .await
    }
}

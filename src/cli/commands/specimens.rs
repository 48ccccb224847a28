use anyhow::Result;

use crate::api::SpecimenQuery;
use crate::cli::commands::{finish, with_controller, CommandContext};
use crate::shipments::ItemState;
use crate::workflows::UserAction;

pub struct SpecimensCommand {
    pub shipment_id: String,
    pub query: SpecimenQuery,
}

impl SpecimensCommand {
    pub fn new(shipment_id: impl Into<String>, query: SpecimenQuery) -> Self {
        Self {
            shipment_id: shipment_id.into(),
            query,
        }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        with_controller(ctx, &self.shipment_id, |controller| async move {
            let page = controller.tracked().specimens(&self.query).await?;
            let filter = self
                .query
                .state
                .map(|state| format!(" {state}"))
                .unwrap_or_default();

            if page.items.is_empty() {
                println!("📋 No{filter} specimens in shipment {}", self.shipment_id);
                return Ok(());
            }

            println!(
                "🧪 {}{filter} specimen(s) in shipment {} (page {})",
                page.total, self.shipment_id, page.page
            );
            for item in &page.items {
                let location = item.location_name.as_deref().unwrap_or("-");
                println!("   {:<16} {:<9} {location}", item.inventory_id, item.state);
            }
            if page.has_next() {
                println!("💡 More on page {}", page.page + 1);
            }
            Ok(())
        })
        .await
    }
}

pub struct TagCommand {
    pub shipment_id: String,
    pub item_state: ItemState,
    pub inventory_ids: String,
}

impl TagCommand {
    pub fn new(shipment_id: impl Into<String>, item_state: ItemState, inventory_ids: &[String]) -> Self {
        Self {
            shipment_id: shipment_id.into(),
            item_state,
            inventory_ids: inventory_ids.join(","),
        }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        with_controller(ctx, &self.shipment_id, |mut controller| async move {
            let outcome = controller
                .dispatch(UserAction::TagSpecimens {
                    item_state: self.item_state,
                    inventory_ids: self.inventory_ids.clone(),
                })
                .await?;
            finish(outcome)
        })
        .await
    }
}

pub struct AddSpecimensCommand {
    pub shipment_id: String,
    pub inventory_ids: String,
}

impl AddSpecimensCommand {
    pub fn new(shipment_id: impl Into<String>, inventory_ids: &[String]) -> Self {
        Self {
            shipment_id: shipment_id.into(),
            inventory_ids: inventory_ids.join(","),
        }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        with_controller(ctx, &self.shipment_id, |mut controller| async move {
            let outcome = controller
                .dispatch(UserAction::AddSpecimens(self.inventory_ids.clone()))
                .await?;
            finish(outcome)
        })
        .await
    }
}

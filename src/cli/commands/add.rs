use anyhow::Result;
use tracing::Instrument;

use crate::cli::commands::show::print_shipment;
use crate::cli::commands::CommandContext;
use crate::shipments::{AddShipment, TrackedShipment};
use crate::workflows::WorkflowTracker;

pub struct AddCommand {
    pub command: AddShipment,
}

impl AddCommand {
    pub fn new(courier_name: &str, tracking_number: &str, from_location_id: &str, to_location_id: &str) -> Self {
        Self {
            command: AddShipment {
                courier_name: courier_name.trim().to_string(),
                tracking_number: tracking_number.trim().to_string(),
                from_location_id: from_location_id.trim().to_string(),
                to_location_id: to_location_id.trim().to_string(),
            },
        }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let span = ctx.session.span("add", None);
        let added = TrackedShipment::add(ctx.api.clone(), ctx.in_flight.clone(), &self.command)
            .instrument(span)
            .await;

        match added {
            Ok(shipment) => {
                println!("✅ Shipment created");
                let tracker = WorkflowTracker::for_shipment(shipment.shipment());
                print_shipment(shipment.shipment(), &tracker);
                println!("💡 Add specimens with 'shipping add-specimens {} <IDS>'", shipment.id());
                Ok(())
            }
            Err(e) => {
                println!("❌ Failed to create shipment: {}", e.user_message());
                Err(e.into())
            }
        }
    }
}

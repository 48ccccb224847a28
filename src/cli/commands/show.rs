use anyhow::Result;

use crate::cli::commands::{with_controller, CommandContext};
use crate::shipments::Shipment;
use crate::workflows::{SkipTarget, WorkflowTracker};

pub struct ShowCommand {
    pub shipment_id: String,
}

impl ShowCommand {
    pub fn new(shipment_id: impl Into<String>) -> Self {
        Self {
            shipment_id: shipment_id.into(),
        }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        with_controller(ctx, &self.shipment_id, |controller| async move {
            print_shipment(controller.shipment(), controller.tracker());
            println!("   🔗 Route: {}", controller.route());
            Ok(())
        })
        .await
    }
}

pub fn print_shipment(shipment: &Shipment, tracker: &WorkflowTracker) {
    println!("📦 Shipment {} (version {})", shipment.id, shipment.version);
    println!("   🚚 Courier: {} / {}", shipment.courier_name, shipment.tracking_number);
    println!(
        "   📍 {} → {}",
        shipment.from_location.name, shipment.to_location.name
    );
    println!("   🧪 Specimens: {}", shipment.specimen_count);
    println!("   🏷️  State: {}", shipment.state);

    if let Some(progress) = tracker.progress() {
        println!("   {progress}");
    }

    for (label, time) in [
        ("Packed", shipment.time_packed),
        ("Sent", shipment.time_sent),
        ("Received", shipment.time_received),
        ("Unpacked", shipment.time_unpacked),
        ("Completed", shipment.time_completed),
    ] {
        if let Some(time) = time {
            println!("   🕒 {label}: {}", time.to_rfc3339());
        }
    }

    let actions = tracker.available_actions();
    if actions.is_empty() {
        println!("   🔒 No further actions: shipment is {}", shipment.state);
        return;
    }
    let labels: Vec<&str> = actions.iter().map(|action| action.label()).collect();
    println!("   ▶️  Available: {}", labels.join(", "));
    if let Some(target) = SkipTarget::for_state(shipment.state) {
        println!("   ⏩ Can skip to {target}");
    }
}

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::io::{self, BufRead, Write};

use crate::cli::commands::{finish, with_controller, CommandContext};
use crate::workflows::{SkipTarget, UserAction};

pub struct SkipCommand {
    pub shipment_id: String,
    pub target: SkipTarget,
    pub first_time: DateTime<Utc>,
    pub second_time: DateTime<Utc>,
    pub auto_approve: bool,
}

impl SkipCommand {
    pub fn new(
        shipment_id: impl Into<String>,
        target: SkipTarget,
        first_time: DateTime<Utc>,
        second_time: DateTime<Utc>,
    ) -> Self {
        Self {
            shipment_id: shipment_id.into(),
            target,
            first_time,
            second_time,
            auto_approve: false,
        }
    }

    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        with_controller(ctx, &self.shipment_id, |mut controller| async move {
            let mut dialog = controller.open_skip_dialog()?;
            if dialog.target() != self.target {
                println!(
                    "❌ Shipment {} is {}; it can only skip to {}",
                    controller.shipment().id,
                    controller.shipment().state,
                    dialog.target()
                );
                anyhow::bail!("skip to {} is not available", self.target);
            }

            let [first_label, second_label] = self.target.time_labels();
            println!("⏩ Skip shipment {} to {}", controller.shipment().id, self.target);
            println!("   {first_label}: {}", self.first_time.to_rfc3339());
            println!("   {second_label}: {}", self.second_time.to_rfc3339());

            dialog
                .set_first_time(self.first_time)
                .set_second_time(self.second_time);
            let outcome = if self.auto_approve || confirm("Record both steps?")? {
                match dialog.confirm() {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        println!("❌ {}", e.user_message());
                        return Err(e.into());
                    }
                }
            } else {
                println!("🚫 Skip cancelled");
                dialog.cancel()
            };

            let outcome = controller.dispatch(UserAction::Skip(outcome)).await?;
            finish(outcome)
        })
        .await
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

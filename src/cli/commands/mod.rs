use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;
use std::sync::Arc;

use crate::api::{RestShipmentApi, ShipmentApi};
use crate::config::ShippingConfig;
use crate::session::SessionContext;
use crate::shipments::InFlightRegistry;
use crate::workflows::{ActionOutcome, ConsoleNotifier, ShipmentController};

pub mod add;
pub mod edit;
pub mod show;
pub mod skip;
pub mod specimens;
pub mod transition;

pub use add::AddCommand;
pub use edit::{EditCommand, RemoveCommand};
pub use show::ShowCommand;
pub use skip::SkipCommand;
pub use specimens::{AddSpecimensCommand, SpecimensCommand, TagCommand};
pub use transition::TransitionCommand;

/// Everything a command needs to reach the server
pub struct CommandContext {
    pub config: ShippingConfig,
    pub session: SessionContext,
    pub api: Arc<dyn ShipmentApi>,
    pub in_flight: InFlightRegistry,
    /// `.env` file read during loading, reported once logging is up
    pub env_file: Option<PathBuf>,
    rest: Arc<RestShipmentApi>,
}

impl CommandContext {
    pub fn new(config: ShippingConfig) -> Result<Self> {
        let session = SessionContext::from_config(&config);
        let rest = Arc::new(
            RestShipmentApi::new(&config, session.clone())
                .context("Failed to build the repository client")?,
        );
        Ok(Self {
            config,
            session,
            api: rest.clone(),
            in_flight: InFlightRegistry::new(),
            env_file: None,
            rest,
        })
    }

    pub fn log_api_stats(&self) {
        self.rest.http().metrics().log_stats();
    }

    /// Load `.env`, then layered config or the explicit file
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let env_file = ShippingConfig::load_env_file()?;
        let config = match config_path {
            Some(path) => ShippingConfig::load_from(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?,
            None => ShippingConfig::load()?,
        };
        let mut ctx = Self::new(config)?;
        ctx.env_file = env_file;
        Ok(ctx)
    }

    pub fn log_startup(&self) {
        if let Some(path) = &self.env_file {
            info!(path = %path.display(), "Loaded environment variables from .env file");
        }
    }
}

pub async fn with_controller<F, Fut, R>(ctx: &CommandContext, shipment_id: &str, f: F) -> Result<R>
where
    F: FnOnce(ShipmentController<ConsoleNotifier>) -> Fut,
    Fut: std::future::Future<Output = Result<R>>,
{
    match ShipmentController::open(
        ctx.session.clone(),
        ctx.api.clone(),
        ctx.in_flight.clone(),
        shipment_id,
        ConsoleNotifier,
    )
    .await
    {
        Ok(controller) => f(controller).await,
        Err(e) => {
            println!("❌ Failed to load shipment {shipment_id}: {}", e.user_message());
            Err(e.into())
        }
    }
}

/// Turn an outcome into the process result; failures were already printed
pub fn finish(outcome: ActionOutcome) -> Result<()> {
    match outcome {
        ActionOutcome::Applied | ActionOutcome::Cancelled => Ok(()),
        ActionOutcome::Disabled => bail!("shipment can no longer change"),
        ActionOutcome::Failed(_) => bail!("operation failed"),
    }
}

pub async fn show_how_to_use() -> Result<()> {
    println!("📦 Shipping - biobank specimen shipment tracker");
    println!();
    println!("Common commands:");
    println!("  🔎 shipping show <ID>             # Where is this shipment?");
    println!("  ➕ shipping add --courier ...     # Create a shipment");
    println!("  📦 shipping pack <ID>             # Record packing (now, or --at)");
    println!("  🚚 shipping send <ID>             # Record hand-off to the courier");
    println!("  📥 shipping receive <ID>          # Record arrival");
    println!("  📂 shipping unpack <ID>           # Start unpacking");
    println!("  🏷️  shipping tag <ID> A1 A2        # Tag specimens as received");
    println!("  ✅ shipping complete <ID>         # Close out the shipment");
    println!();
    println!("💡 Use 'shipping skip <ID> --to sent' when packing and sending already happened.");
    Ok(())
}

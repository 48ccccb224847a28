use anyhow::Result;
use clap::Parser;

use specimen_shipping::api::SpecimenQuery;
use specimen_shipping::cli::commands::{
    show_how_to_use, AddCommand, AddSpecimensCommand, CommandContext, EditCommand, RemoveCommand,
    ShowCommand, SkipCommand, SpecimensCommand, TagCommand, TransitionCommand,
};
use specimen_shipping::cli::{Cli, Commands};
use specimen_shipping::shipments::ShipmentAction;
use specimen_shipping::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Default behavior: no subcommand - explain how to use the tool
    let Some(command) = cli.command else {
        return tokio::runtime::Runtime::new()?.block_on(show_how_to_use());
    };

    let ctx = CommandContext::load(cli.config.as_deref())?;
    let mut observability = ctx.config.observability.clone();
    observability.json_logs |= cli.json_logs;
    if let Err(e) = init_telemetry(&observability) {
        eprintln!("Warning: Failed to initialize telemetry: {e}");
    }
    ctx.log_startup();

    tokio::runtime::Runtime::new()?.block_on(async {
        let result = run(command, &ctx).await;
        ctx.log_api_stats();
        result
    })
}

async fn run(command: Commands, ctx: &CommandContext) -> Result<()> {
    match command {
        Commands::Show { id } => ShowCommand::new(id).execute(ctx).await,
        Commands::Add {
            courier,
            tracking,
            from,
            to,
        } => AddCommand::new(&courier, &tracking, &from, &to).execute(ctx).await,
        Commands::Pack { id, at } => transition(ctx, id, ShipmentAction::Pack, at).await,
        Commands::Send { id, at } => transition(ctx, id, ShipmentAction::Send, at).await,
        Commands::Receive { id, at } => transition(ctx, id, ShipmentAction::Receive, at).await,
        Commands::Unpack { id, at } => transition(ctx, id, ShipmentAction::Unpack, at).await,
        Commands::Complete { id, at } => transition(ctx, id, ShipmentAction::Complete, at).await,
        Commands::Lose { id } => transition(ctx, id, ShipmentAction::Lose, None).await,
        Commands::Reopen { id } => transition(ctx, id, ShipmentAction::Reopen, None).await,
        Commands::Skip {
            id,
            to,
            first,
            second,
            yes,
        } => {
            SkipCommand::new(id, to.into(), first, second)
                .with_auto_approve(yes)
                .execute(ctx)
                .await
        }
        Commands::Specimens {
            id,
            state,
            page,
            limit,
        } => {
            let query = SpecimenQuery {
                state,
                page,
                limit: limit.unwrap_or(ctx.config.ui.page_size),
                ..SpecimenQuery::default()
            };
            SpecimensCommand::new(id, query).execute(ctx).await
        }
        Commands::Tag {
            id,
            item_state,
            inventory_ids,
        } => TagCommand::new(id, item_state, &inventory_ids).execute(ctx).await,
        Commands::AddSpecimens { id, inventory_ids } => {
            AddSpecimensCommand::new(id, &inventory_ids).execute(ctx).await
        }
        Commands::Edit {
            id,
            courier,
            tracking,
            from,
            to,
        } => {
            EditCommand::new(id)
                .courier(courier)
                .tracking(tracking)
                .from_location(from)
                .to_location(to)
                .execute(ctx)
                .await
        }
        Commands::Remove { id } => RemoveCommand::new(id).execute(ctx).await,
    }
}

async fn transition(
    ctx: &CommandContext,
    id: String,
    action: ShipmentAction,
    at: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<()> {
    TransitionCommand::new(id, action).at(at).execute(ctx).await
}

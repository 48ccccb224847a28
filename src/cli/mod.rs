use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::shipments::ItemState;
use crate::workflows::SkipTarget;

pub mod commands;

#[derive(Parser)]
#[command(name = "shipping")]
#[command(about = "Track biobank specimen shipments from packing to unpacking")]
#[command(long_about = "Moves shipments through their lifecycle (created, packed, sent, received, \
                       unpacked, completed) against the repository server. Start with \
                       'shipping show <ID>' to see where a shipment is.")]
pub struct Cli {
    /// Read configuration from this TOML file instead of shipping.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SkipTo {
    Sent,
    Unpacked,
}

impl From<SkipTo> for SkipTarget {
    fn from(to: SkipTo) -> Self {
        match to {
            SkipTo::Sent => SkipTarget::Sent,
            SkipTo::Unpacked => SkipTarget::Unpacked,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a shipment, its progress and the actions available to it
    Show {
        id: String,
    },
    /// Create a new shipment between two locations
    Add {
        #[arg(long)]
        courier: String,
        #[arg(long)]
        tracking: String,
        /// Location id the shipment leaves from
        #[arg(long)]
        from: String,
        /// Location id the shipment is going to
        #[arg(long)]
        to: String,
    },
    /// Mark a shipment as packed
    Pack {
        id: String,
        /// When it was packed (RFC 3339); defaults to now
        #[arg(long, value_parser = parse_time)]
        at: Option<DateTime<Utc>>,
    },
    /// Mark a shipment as sent
    Send {
        id: String,
        #[arg(long, value_parser = parse_time)]
        at: Option<DateTime<Utc>>,
    },
    /// Mark a shipment as received at its destination
    Receive {
        id: String,
        #[arg(long, value_parser = parse_time)]
        at: Option<DateTime<Utc>>,
    },
    /// Mark a shipment as unpacked
    Unpack {
        id: String,
        #[arg(long, value_parser = parse_time)]
        at: Option<DateTime<Utc>>,
    },
    /// Complete an unpacked shipment once every item is accounted for
    Complete {
        id: String,
        #[arg(long, value_parser = parse_time)]
        at: Option<DateTime<Utc>>,
    },
    /// Mark a shipment as lost in transit
    Lose {
        id: String,
    },
    /// Return a packed or sent shipment to created so it can be edited
    Reopen {
        id: String,
    },
    /// Record two lifecycle steps at once
    Skip {
        id: String,
        #[arg(long, value_enum)]
        to: SkipTo,
        /// Packed time (to sent) or received time (to unpacked)
        #[arg(long, value_parser = parse_time)]
        first: DateTime<Utc>,
        /// Sent time (to sent) or unpacked time (to unpacked)
        #[arg(long, value_parser = parse_time)]
        second: DateTime<Utc>,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// List the specimens in a shipment
    Specimens {
        id: String,
        /// Only show items in this state (present, received, missing, extra)
        #[arg(long)]
        state: Option<ItemState>,
        #[arg(long, default_value = "1")]
        page: u32,
        /// Page size; defaults to the configured ui.page_size
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Tag specimens of an unpacked shipment by inventory id
    Tag {
        id: String,
        #[arg(long = "as", default_value = "received")]
        item_state: ItemState,
        /// Inventory ids, separated by commas or whitespace
        #[arg(required = true, num_args = 1..)]
        inventory_ids: Vec<String>,
    },
    /// Add specimens to a shipment that has not been packed
    AddSpecimens {
        id: String,
        #[arg(required = true, num_args = 1..)]
        inventory_ids: Vec<String>,
    },
    /// Edit the courier, tracking number or locations of a created shipment
    Edit {
        id: String,
        #[arg(long)]
        courier: Option<String>,
        #[arg(long)]
        tracking: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Delete a shipment that has not been packed
    Remove {
        id: String,
    },
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 time such as 2024-03-01T09:30:00Z ({e})"))
}

//! CLI argument definitions using clap
//!
//! Commands:
//! - controltower create --source <raw> --destination <raw>
//! - controltower transition --shipment-id <id> --to <state> --event-type <type> --role <role>
//! - controltower assess-risk --shipment-id <id>
//! - controltower verify-log
//! - controltower report
//! - controltower snapshot
//! - controltower verify-snapshot --name <family> [--chain <names>...]
//! - controltower replay --name <family> [--at <epoch>]
//! - controltower export-evidence --name <family> [--format tar|json|csv]
//! - controltower notifications --role <role> [--unread]
//! - controltower worker

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// controltower - event-sourced logistics control tower
#[derive(Parser, Debug)]
#[command(name = "controltower")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Root data directory
    #[arg(long, default_value = "./data", global = true)]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a shipment (generates the id, emits SHIPMENT_CREATED)
    Create {
        /// Raw origin string, e.g. "Mumbai"
        #[arg(long)]
        source: String,

        /// Raw destination string, e.g. "Kochi"
        #[arg(long)]
        destination: String,

        /// Acting role
        #[arg(long, default_value = "SENDER")]
        role: String,
    },

    /// Append a lifecycle transition for an existing shipment
    Transition {
        /// Shipment id (SHP-0000000001)
        #[arg(long)]
        shipment_id: String,

        /// Target lifecycle state
        #[arg(long)]
        to: String,

        /// Event type (defaults to the target state's token)
        #[arg(long)]
        event_type: Option<String>,

        /// Acting role
        #[arg(long)]
        role: String,
    },

    /// Fuse weather, corridor, and ETA signals into a risk assessment
    AssessRisk {
        /// Shipment id (SHP-0000000001)
        #[arg(long)]
        shipment_id: String,
    },

    /// Verify event log integrity (sequences, timestamps, transitions)
    VerifyLog,

    /// Print the full audit report for the log
    Report,

    /// Refresh every snapshot family once
    Snapshot,

    /// Tamper-check one snapshot, optionally verifying chain linkage
    VerifySnapshot {
        /// Snapshot family name
        #[arg(long)]
        name: String,

        /// Ordered snapshot names for chain verification
        #[arg(long, num_args = 1..)]
        chain: Option<Vec<String>>,
    },

    /// Forensic replay of a snapshot
    Replay {
        /// Snapshot family name
        #[arg(long)]
        name: String,

        /// Replay "as of" this epoch-seconds timestamp
        #[arg(long)]
        at: Option<f64>,
    },

    /// Export a snapshot as an evidence bundle
    ExportEvidence {
        /// Snapshot family name (repeat for a multi-snapshot bundle)
        #[arg(long, num_args = 1..)]
        name: Vec<String>,

        /// Output format: tar, json, or csv
        #[arg(long, default_value = "tar")]
        format: String,

        /// Output directory
        #[arg(long, default_value = "./evidence")]
        out: PathBuf,
    },

    /// List notifications for a role
    Notifications {
        /// Recipient role
        #[arg(long)]
        role: String,

        /// Only unread
        #[arg(long)]
        unread: bool,
    },

    /// Run the periodic snapshot worker in the foreground
    Worker,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

//! liftsync CLI
//!
//! Command-line tools for inspecting and repairing a sync queue file while
//! the client is not running. Never contacts the remote store.
//!
//! # Commands
//!
//! - `status` - Display pending and failed counts
//! - `list` - List queued records
//! - `requeue` - Return failed records to pending
//! - `recover` - Return interrupted records to pending
//! - `discard` - Remove a failed record

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// liftsync queue maintenance tools.
#[derive(Parser)]
#[command(name = "liftsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the queue file
    #[arg(global = true, short, long, env = "LIFTSYNC_QUEUE")]
    queue: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display pending and failed counts
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List queued records in dispatch order
    List {
        /// Only show failed records
        #[arg(long)]
        failed: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Return failed records to pending with a fresh retry budget
    Requeue,

    /// Return records interrupted mid-sync to pending
    Recover,

    /// Remove a failed record
    Discard {
        /// Record id
        id: String,
    },

    /// Show version information
    Version,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Status { format } => {
            let path = cli.queue.ok_or("Queue path required for status")?;
            commands::status::run(&path, &format).await?;
        }
        Commands::List { failed, format } => {
            let path = cli.queue.ok_or("Queue path required for list")?;
            commands::list::run(&path, failed, &format).await?;
        }
        Commands::Requeue => {
            let path = cli.queue.ok_or("Queue path required for requeue")?;
            commands::repair::requeue(&path).await?;
        }
        Commands::Recover => {
            let path = cli.queue.ok_or("Queue path required for recover")?;
            commands::repair::recover(&path).await?;
        }
        Commands::Discard { id } => {
            let path = cli.queue.ok_or("Queue path required for discard")?;
            commands::repair::discard(&path, &id).await?;
        }
        Commands::Version => {
            println!("liftsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "Queue format v{}",
                liftsync_queue::QUEUE_FORMAT_VERSION
            );
        }
    }

    Ok(())
}

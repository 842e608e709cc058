//! NDK CLI
//!
//! Developer tools for the NDK bridge.
//!
//! # Commands
//!
//! - `outbox list` - List the envelopes waiting in an outbox directory
//! - `outbox show` - Print one envelope file
//! - `modules` - Dump the loaded module list
//! - `capture` - Write a test event into an outbox

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// NDK bridge command-line tools.
#[derive(Parser)]
#[command(name = "ndk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(global = true, short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect an outbox
    Outbox {
        #[command(subcommand)]
        command: OutboxCommands,
    },

    /// Dump the loaded module list
    Modules {
        /// Read mappings from this file instead of the current process
        #[arg(short, long)]
        maps: Option<PathBuf>,
    },

    /// Capture a test event into an outbox
    Capture {
        /// Outbox directory
        #[arg(short, long)]
        outbox: PathBuf,

        /// DSN recorded in the envelope header
        #[arg(short, long)]
        dsn: String,

        /// Event message
        #[arg(short, long, default_value = "test event")]
        message: String,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum OutboxCommands {
    /// List pending envelopes
    List {
        /// Outbox directory
        dir: PathBuf,
    },

    /// Print one envelope
    Show {
        /// Envelope file
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Outbox { command } => match command {
            OutboxCommands::List { dir } => commands::outbox::list(&dir, &cli.format)?,
            OutboxCommands::Show { file } => commands::outbox::show(&file, &cli.format)?,
        },
        Commands::Modules { maps } => commands::modules::run(maps.as_deref(), &cli.format)?,
        Commands::Capture {
            outbox,
            dsn,
            message,
        } => commands::capture::run(&outbox, &dsn, &message, cli.verbose, &cli.format)?,
        Commands::Version => {
            println!("NDK CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("NDK Bridge v{}", ndk_bridge::VERSION);
            println!("NDK Engine v{}", ndk_engine::VERSION);
        }
    }

    Ok(())
}

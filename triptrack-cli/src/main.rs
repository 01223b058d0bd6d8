//! TripTrack CLI - Command-line interface
//!
//! Resolves addresses, requests routes and follows live trips using the
//! TripTrack library.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::route::RouteArgs;
use commands::track::TrackArgs;
use error::CliError;
use runner::GlobalOptions;

#[derive(Parser)]
#[command(name = "triptrack")]
#[command(about = "Live trip tracking for fleet consignments", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.triptrack/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Resolve an address to coordinates
    Geocode {
        /// Free-text address
        address: String,
    },

    /// Request driving routes between two addresses
    Route {
        /// Origin address
        from: String,

        /// Destination address
        to: String,

        /// Request alternate routes (overrides want_alternates in config)
        #[arg(long)]
        alternates: Option<bool>,
    },

    /// Follow a consignment's live position until Ctrl+C
    Track {
        /// Consignment identifier
        #[arg(long)]
        consignment: String,

        /// Pickup address
        #[arg(long)]
        pickup: String,

        /// Drop address
        #[arg(long)]
        drop: String,

        /// Frame the shortest route instead of the primary one
        #[arg(long)]
        shortest: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let options = GlobalOptions {
        config_path: cli.config,
        debug: cli.debug,
        log_file: cli.log_file,
    };

    if let Err(e) = run(&options, cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(options: &GlobalOptions, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Init { force } => commands::init::run(&options.resolve_config_path()?, force),
        Commands::Geocode { address } => commands::geocode::run(options, &address),
        Commands::Route {
            from,
            to,
            alternates,
        } => commands::route::run(
            options,
            RouteArgs {
                from,
                to,
                alternates,
            },
        ),
        Commands::Track {
            consignment,
            pickup,
            drop,
            shortest,
        } => commands::track::run(
            options,
            TrackArgs {
                consignment,
                pickup,
                drop,
                shortest,
            },
        ),
    }
}

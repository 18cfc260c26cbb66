//! CLI argument definitions using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fetch remote media, store it locally and serve it back exactly once.
#[derive(Parser, Debug)]
#[command(name = "media-dl")]
#[command(author, version, about)]
pub struct Args {
    /// Directory holding config.json (default: $CONFIG_DIR or ./.config)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// What to run
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download one resource into the video directory
    Download {
        /// Resource URL
        url: String,

        /// Who to notify when the item is ready
        #[arg(short, long)]
        requester: Option<String>,
    },

    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides $PORT and the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

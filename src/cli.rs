// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "labs-launcher")]
#[command(about = "Run and update the EPI2ME Labs notebook server container")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: discovered from the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Only print final results and warnings
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new labs-launcher.yml configuration file
    Init {
        /// Image repository to use
        #[arg(long)]
        image: Option<String>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show engine availability, container status and tags
    Status,

    /// List the image tags available in the registry
    Tags,

    /// Pull an image tag (default: the newest in the registry)
    Pull {
        /// Tag to pull, e.g. v1.2.0
        tag: Option<String>,
    },

    /// Pull the newest tag if it is not already present locally
    Update,

    /// Replace any running server with a fresh container
    Start {
        /// Host directory to mount into the container
        #[arg(long)]
        mount: Option<String>,

        /// Notebook server port
        #[arg(long)]
        port: Option<u16>,

        /// Auxiliary port
        #[arg(long)]
        aux_port: Option<u16>,

        /// Notebook access token
        #[arg(long)]
        token: Option<String>,
    },

    /// Stop and remove the server container
    Stop,

    /// Follow status changes until interrupted
    Watch {
        /// Seconds between refreshes (default: the configured heartbeat)
        #[arg(long)]
        interval: Option<u64>,
    },
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Personal media gallery server and maintenance tool
#[derive(Parser, Debug)]
#[command(name = "teledeck", version)]
#[command(about = "Serve, import and maintain a personal media gallery", long_about = None)]
pub struct Cli {
    /// TOML config file (defaults to the per-user config file when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Database URL, overriding config and environment
    #[arg(long, global = true, value_name = "URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Listen address, e.g. 127.0.0.1:4000
        #[arg(long)]
        bind: Option<String>,
    },
    /// Register media files found under a directory inside the media root
    Import {
        dir: PathBuf,
        /// Channel title to attach to the imported items
        #[arg(short, long)]
        channel: Option<String>,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Print library counters as JSON
    Stats,
    /// Compact the database
    Vacuum,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create a login
    Add { email: String, password: String },
}

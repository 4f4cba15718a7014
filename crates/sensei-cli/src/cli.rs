//! CLI argument definitions using clap
//!
//! The command implementations live in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// UPISensei - Turn bank statements into answers about your spending
#[derive(Parser)]
#[command(name = "upisensei")]
#[command(about = "Bank statement extraction and spending assistant", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config override file (defaults to the user data directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on (config default: 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (config default: 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Start with an empty store instead of the demo transactions
        #[arg(long)]
        no_seed: bool,

        /// Allowed CORS origin (repeatable)
        #[arg(long = "cors-origin")]
        cors_origin: Vec<String>,
    },

    /// Extract transactions from a PDF or CSV statement
    Extract {
        /// Statement file (.pdf or .csv)
        file: PathBuf,

        /// Print transactions as JSON
        #[arg(long)]
        json: bool,

        /// Date that synthesized dates count back from (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Show the category and merchant derived from a description
    Categorize {
        /// Transaction description, e.g. "UPI/SWIGGY/ORDER123"
        description: String,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the resolved configuration (secrets masked)
    Show,
    /// Print the override file location
    Path,
}

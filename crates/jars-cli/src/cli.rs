//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jars_core::client::DEFAULT_API_URL;
use jars_server::DEFAULT_PORT;

/// Jars - Six-jar money management
#[derive(Parser)]
#[command(name = "jars")]
#[command(about = "Six-jar budgeting: classify spending, track jars and goals", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Flat-file database path (defaults to the platform data dir)
    #[arg(long, env = "JARS_DATA_FILE", global = true)]
    pub data_file: Option<PathBuf>,

    /// Jar settings TOML (defaults to the data dir override, then built-in)
    #[arg(long, env = "JARS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// API origin used by client commands (login, notifications)
    #[arg(long, env = "JARS_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data file (seeded) and a settings file to edit
    Init {
        /// Replace an existing data file with fresh seed data
        #[arg(long)]
        force: bool,
    },

    /// Start the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Host to bind to
        #[arg(long, env = "HOST", default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication on local routes (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        #[arg(long, env = "JARS_NO_AUTH")]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// API Gateway base URL for the /api/v1 relay routes
        #[arg(long, env = "API_GATEWAY_BASE")]
        gateway: Option<String>,

        /// Secret for signing local bearer tokens
        #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
        jwt_secret: Option<String>,

        /// Allowed CORS origins (comma-separated)
        #[arg(long, env = "JARS_ALLOWED_ORIGINS", value_delimiter = ',')]
        allowed_origins: Vec<String>,
    },

    /// Show which jar a description is classified into
    Classify {
        /// Transaction description
        #[arg(required = true)]
        description: Vec<String>,
    },

    /// Per-jar spending report, or split an income across the jars
    Budget {
        /// Month to report (YYYY-MM); all transactions if not specified
        #[arg(short, long)]
        month: Option<String>,

        /// Split this income by the configured percents instead
        #[arg(long)]
        income: Option<f64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show progress towards savings goals
    Goals {
        /// Print progress as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log in to the API server and save the token
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "JARS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log out and remove the saved token
    Logout,

    /// List notifications from the API server
    Notifications {
        /// Keep polling and report changes until Ctrl+C
        #[arg(short, long)]
        watch: bool,

        /// Poll interval in seconds (3-60)
        #[arg(long, env = "JARS_POLL_INTERVAL")]
        interval: Option<u64>,
    },
}

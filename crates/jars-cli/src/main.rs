//! Jars CLI - Six-jar budgeting
//!
//! Usage:
//!   jars init                     Create the data file and settings
//!   jars serve --port 5001        Start the API server
//!   jars classify "Grab taxi"     Show which jar a description falls in
//!   jars budget --month 2024-06   Per-jar spending report
//!   jars notifications --watch    Poll notifications from a running server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let data_file = commands::data_file_path(cli.data_file.as_deref());

    match cli.command {
        Commands::Init { force } => {
            let config_path = commands::config_file_path(cli.config.as_deref());
            commands::cmd_init(&data_file, &config_path, force)
        }
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
            gateway,
            jwt_secret,
            allowed_origins,
        } => {
            let settings = commands::load_settings(cli.config.as_deref())?;
            commands::cmd_serve(
                &data_file,
                settings,
                commands::ServeOptions {
                    host,
                    port,
                    no_auth,
                    static_dir,
                    gateway,
                    jwt_secret,
                    allowed_origins,
                },
            )
            .await
        }
        Commands::Classify { description } => {
            let settings = commands::load_settings(cli.config.as_deref())?;
            commands::cmd_classify(&settings, &description.join(" "))
        }
        Commands::Budget { month, income, json } => {
            let settings = commands::load_settings(cli.config.as_deref())?;
            match income {
                Some(income) => commands::cmd_allocate(&settings, income),
                None => {
                    let store = commands::open_store(&data_file)?;
                    commands::cmd_budget(&store, &settings, month.as_deref(), json)
                }
            }
        }
        Commands::Goals { json } => {
            let store = commands::open_store(&data_file)?;
            commands::cmd_goals(&store, json)
        }
        Commands::Login { email, password } => {
            let client = commands::api_client(&cli.api_url);
            commands::cmd_login(&client, &email, &password).await
        }
        Commands::Logout => {
            let client = commands::api_client(&cli.api_url);
            commands::cmd_logout(&client).await
        }
        Commands::Notifications { watch, interval } => {
            let client = commands::api_client(&cli.api_url);
            if watch {
                commands::cmd_notifications_watch(client, interval).await
            } else {
                commands::cmd_notifications_list(&client).await
            }
        }
    }
}

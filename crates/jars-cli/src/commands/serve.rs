//! Server command implementation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jars_core::JarSettings;

use super::open_store;

/// Flags for `jars serve`
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    pub no_auth: bool,
    pub static_dir: Option<PathBuf>,
    pub gateway: Option<String>,
    pub jwt_secret: Option<String>,
    pub allowed_origins: Vec<String>,
}

pub async fn cmd_serve(data_file: &Path, settings: JarSettings, opts: ServeOptions) -> Result<()> {
    println!("🚀 Starting Jars API server...");
    println!("   Data file: {}", data_file.display());
    println!("   Listening: http://{}:{}", opts.host, opts.port);
    if let Some(dir) = &opts.static_dir {
        println!("   Static files: {}", dir.display());
    }

    let gateway = opts.gateway.filter(|g| !g.trim().is_empty());
    match &gateway {
        Some(base) => println!("   🔀 API Gateway: {}", base),
        None => println!("   💡 Tip: Set API_GATEWAY_BASE to enable the /api/v1 relay"),
    }

    if opts.no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!("   🔒 Authentication: bearer tokens (HS256)");
        if opts.jwt_secret.is_none() {
            println!("      Set JWT_SECRET so tokens survive a restart");
        }
    }
    if !opts.allowed_origins.is_empty() {
        println!("   🌐 CORS origins: {}", opts.allowed_origins.join(", "));
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let store = open_store(data_file)?;

    let config = jars_server::ServerConfig {
        require_auth: !opts.no_auth,
        allowed_origins: opts.allowed_origins,
        jwt_secret: opts.jwt_secret,
        gateway_base: gateway,
        settings,
    };

    let static_dir = match &opts.static_dir {
        Some(dir) => Some(
            dir.to_str()
                .context("static_dir path must be valid UTF-8")?,
        ),
        None => None,
    };
    jars_server::serve_with_config(store, &opts.host, opts.port, static_dir, config).await?;

    Ok(())
}

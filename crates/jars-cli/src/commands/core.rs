//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_store` - Shared utility to open the flat-file database
//! - `load_settings` - Jar settings from a file or the default resolution
//! - `cmd_init` - Create the data file and settings override

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jars_core::config::{default_config_path, default_data_file, DEFAULT_CONFIG};
use jars_core::{JarSettings, Store};

/// The data file to use: the flag/env value, else the platform default
pub fn data_file_path(flag: Option<&Path>) -> PathBuf {
    flag.map(Path::to_path_buf).unwrap_or_else(default_data_file)
}

/// Open the flat-file database, seeding it if it does not exist
pub fn open_store(path: &Path) -> Result<Store> {
    Store::open(path).with_context(|| format!("Failed to open data file {}", path.display()))
}

/// The settings file to use: the flag/env value, else the data dir override path
pub fn config_file_path(flag: Option<&Path>) -> PathBuf {
    flag.map(Path::to_path_buf).unwrap_or_else(default_config_path)
}

/// Settings from an explicit file, else the data dir override or built-in defaults
pub fn load_settings(path: Option<&Path>) -> Result<JarSettings> {
    match path {
        Some(path) => JarSettings::load_from(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => JarSettings::load().context("Failed to load jar settings"),
    }
}

pub fn cmd_init(data_file: &Path, config_path: &Path, force: bool) -> Result<()> {
    println!("🔧 Initializing data file at {}...", data_file.display());

    if force && data_file.exists() {
        fs::remove_file(data_file)
            .with_context(|| format!("Failed to remove {}", data_file.display()))?;
        println!("   Removed existing data file (--force)");
    }

    let store = open_store(data_file)?;
    let db = store.snapshot()?;
    println!(
        "   {} users, {} transactions, {} goals, {} jars",
        db.users.len(),
        db.transactions.len(),
        db.goals.len(),
        db.jars.len()
    );

    write_default_config(config_path)?;

    println!("✅ Data file ready!");
    println!();
    println!("Next steps:");
    println!("  1. Adjust jar percents: {}", config_path.display());
    println!("  2. Start the API: jars serve");

    Ok(())
}

/// Write the built-in settings to `path` unless a file is already there
pub fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        println!("   Settings already exist: {}", path.display());
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("   Wrote default settings: {}", path.display());
    Ok(true)
}

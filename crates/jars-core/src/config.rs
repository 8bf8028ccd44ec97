//! Jar settings configuration
//!
//! Settings are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/jars/config/jars.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! The file carries the per-jar percent of income, extra classification
//! keywords and the classification fallback.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::classify::Fallback;
use crate::error::{Error, Result};
use crate::models::{Jar, JarCode};

/// Embedded default config (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../config/jars.toml");

/// Platform data directory for Jars (e.g. ~/.local/share/jars)
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jars")
}

/// Default location of the flat-file database
pub fn default_data_file() -> PathBuf {
    data_dir().join("db.json")
}

/// Default location of the settings override file
pub fn default_config_path() -> PathBuf {
    data_dir().join("config").join("jars.toml")
}

/// Per-jar allocation and classification settings
#[derive(Debug, Clone, PartialEq)]
pub struct JarSettings {
    percent: BTreeMap<JarCode, f64>,
    keywords: BTreeMap<JarCode, Vec<String>>,
    fallback: Fallback,
}

impl Default for JarSettings {
    fn default() -> Self {
        // The embedded file is part of the build; a parse failure is a packaging bug
        parse_config(DEFAULT_CONFIG).unwrap_or_else(|e| {
            warn!("Embedded jar settings invalid: {}", e);
            Self {
                percent: BTreeMap::new(),
                keywords: BTreeMap::new(),
                fallback: Fallback::default(),
            }
        })
    }
}

impl JarSettings {
    /// Load settings from the data dir override, or the embedded defaults
    pub fn load() -> Result<Self> {
        let path = default_config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!("No settings override at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load settings from a specific TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let settings = parse_config(&content)?;
        debug!("Loaded jar settings from {}", path.display());
        Ok(settings)
    }

    /// Parse settings from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        parse_config(content)
    }

    /// Configured percent for a jar (0 when unset)
    pub fn percent(&self, jar: JarCode) -> f64 {
        self.percent.get(&jar).copied().unwrap_or(0.0)
    }

    pub fn set_percent(&mut self, jar: JarCode, percent: f64) -> Result<()> {
        if !percent.is_finite() || percent < 0.0 {
            return Err(Error::Validation(format!(
                "Percent for {} must be a non-negative number",
                jar
            )));
        }
        self.percent.insert(jar, percent);
        Ok(())
    }

    /// Sum of all configured percents
    pub fn total_percent(&self) -> f64 {
        JarCode::ALL.iter().map(|j| self.percent(*j)).sum()
    }

    /// Whether the percents sum to 100
    pub fn is_balanced(&self) -> bool {
        (self.total_percent() - 100.0).abs() < 1e-6
    }

    /// Extra keywords configured for a jar
    pub fn keywords(&self, jar: JarCode) -> &[String] {
        self.keywords.get(&jar).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fallback(&self) -> Fallback {
        self.fallback
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Overlay percents stored on jar records (records whose key is not a jar code are skipped)
    pub fn with_jars(mut self, jars: &[Jar]) -> Self {
        for jar in jars {
            match jar.code() {
                Some(code) if jar.percent.is_finite() && jar.percent >= 0.0 => {
                    self.percent.insert(code, jar.percent);
                }
                Some(code) => warn!(jar = %code, percent = jar.percent, "Ignoring invalid jar percent"),
                None => debug!(jar_code = %jar.jar_code, "Skipping jar record without a jar code"),
            }
        }
        self
    }
}

// ============================================================================
// TOML parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawConfig {
    fallback: Option<String>,
    percent: Option<HashMap<String, f64>>,
    keywords: Option<HashMap<String, Vec<String>>>,
}

fn parse_jar(key: &str) -> Result<JarCode> {
    key.parse()
        .map_err(|e: String| Error::InvalidData(format!("Invalid jar settings: {}", e)))
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<JarSettings> {
    let raw: RawConfig = toml::from_str(content)?;

    let mut settings = JarSettings {
        percent: BTreeMap::new(),
        keywords: BTreeMap::new(),
        fallback: Fallback::default(),
    };

    if let Some(fallback) = raw.fallback {
        settings.fallback = fallback
            .parse()
            .map_err(|e: String| Error::InvalidData(format!("Invalid jar settings: {}", e)))?;
    }

    for (key, value) in raw.percent.unwrap_or_default() {
        let jar = parse_jar(&key)?;
        settings.set_percent(jar, value)?;
    }

    for (key, words) in raw.keywords.unwrap_or_default() {
        let jar = parse_jar(&key)?;
        let words: Vec<String> = words
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        settings.keywords.entry(jar).or_default().extend(words);
    }

    if !settings.is_balanced() {
        warn!(
            total = settings.total_percent(),
            "Jar percents do not sum to 100"
        );
    }

    Ok(settings)
}

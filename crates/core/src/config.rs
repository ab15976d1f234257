//! Module configuration.
//!
//! Settings resolve in three layers: built-in defaults, an optional TOML
//! file under the user's config directory, and `VAS_*` environment
//! overrides.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Directory under the user's config root holding module settings.
pub const CONFIG_DIR: &str = "vas";

/// Settings file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Description keywords that mark an item as mountable on a vehicle.
pub const DEFAULT_UPGRADE_KEYWORDS: &[&str] = &[
    "bikes",
    "jetskis",
    "gyrocopters",
    "groundcars",
    "vehicles",
    "aerozep",
    "av-4",
    "cabin cruiser",
    "yacht",
];

/// Runtime-tunable settings for the seating module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Delay before a seating change is reconciled into permissions.
    /// Rapid changes for the same occupant within this window collapse
    /// into one reconciliation.
    pub access_debounce_ms: u64,
    /// Keywords matched (case-insensitively) against item descriptions
    /// to recognise vehicle upgrades.
    pub upgrade_keywords: Vec<String>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            access_debounce_ms: 500,
            upgrade_keywords: DEFAULT_UPGRADE_KEYWORDS
                .iter()
                .map(|kw| kw.to_string())
                .collect(),
        }
    }
}

impl ModuleConfig {
    /// Load settings from the default file location plus environment
    /// overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load settings layered over the given file path. A missing file is
    /// fine; defaults and environment still apply.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let defaults =
            Config::try_from(&Self::default()).context("failed to prepare default settings")?;

        let mut builder = Config::builder().add_source(defaults);
        if path.exists() {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        let settings = builder
            .add_source(Environment::with_prefix("VAS").try_parsing(true))
            .build()
            .context("failed to assemble module settings")?;

        settings
            .try_deserialize()
            .context("failed to deserialize module settings")
    }

    /// The debounce delay as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.access_debounce_ms)
    }
}

/// Location of the settings file under the user's config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Write a commented default settings file if none exists yet. Never
/// overwrites an existing file.
pub fn ensure_default_config() -> Result<()> {
    ensure_default_config_at(default_config_path())
}

/// As [`ensure_default_config`], at an explicit path.
pub fn ensure_default_config_at(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let defaults = ModuleConfig::default();
    let keywords = defaults
        .upgrade_keywords
        .iter()
        .map(|kw| format!("\"{kw}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let contents = format!(
        "# Vehicle sheet module settings.\n\
         #\n\
         # access_debounce_ms: delay before seating changes are reconciled\n\
         #   into vehicle permissions.\n\
         # upgrade_keywords: description keywords that mark an item as a\n\
         #   vehicle upgrade.\n\
         \n\
         access_debounce_ms = {}\n\
         upgrade_keywords = [{}]\n",
        defaults.access_debounce_ms, keywords
    );

    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

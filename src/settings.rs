//! Application settings
//!
//! Stored as JSON in the platform config directory. A missing file is created
//! with defaults on first load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::{config, defaults};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Pilot name given to kneeboard flights no system filled
    #[serde(default = "default_callsign")]
    pub callsign: String,
    /// Root of configuration records; platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Root of DTC and kneeboard templates; `<data dir>/templates` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_callsign() -> String {
    defaults::CALLSIGN.to_string()
}

fn default_log_level() -> String {
    defaults::LOG_LEVEL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            callsign: default_callsign(),
            data_dir: None,
            template_dir: None,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(config::APP_DIR);
        path.push(config::FILENAME);
        path
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Settings file not found, creating defaults");
            let settings = Settings::default();
            settings.save_to(path)?;
            return Ok(settings);
        }

        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {:?}", path))?;

        info!(path = %path.display(), callsign = %settings.callsign, "Loaded settings");
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json).with_context(|| format!("Failed to write settings to {:?}", path))?;
        info!(path = %path.display(), "Saved settings");
        Ok(())
    }

    fn data_root(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(config::APP_DIR);
            path
        })
    }

    /// Directory holding one subdirectory of records per airframe
    pub fn configs_dir(&self) -> PathBuf {
        self.data_root().join(config::CONFIGS_DIR)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.template_dir
            .clone()
            .unwrap_or_else(|| self.data_root().join(config::TEMPLATES_DIR))
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{tlog, tlog_debug, Error, Result};

/// Glyphs and length used for timebox tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeboxConfig {
    /// Minutes per timebox.
    pub time: u32,
    pub pending_glyph: String,
    pub done_glyph: String,
    pub underestimated_glyph: String,
}

impl Default for TimeboxConfig {
    fn default() -> Self {
        Self {
            time: 25,
            pending_glyph: "◻".to_string(),
            done_glyph: "◼".to_string(),
            underestimated_glyph: "◆".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between backend polls.
    pub refresh_rate: u64,
    pub hide_empty: bool,
    pub hide_projects: bool,
    pub show_completed: bool,
    pub notifications: bool,
    pub data_location: String,
    pub taskrc_location: String,
    pub timebox: TimeboxConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_rate: 1,
            hide_empty: true,
            hide_projects: false,
            show_completed: true,
            notifications: true,
            data_location: "~/.task".to_string(),
            taskrc_location: "~/.taskrc".to_string(),
            timebox: TimeboxConfig::default(),
        }
    }
}

impl Config {
    pub fn app_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".tasksched"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("config.toml"))
    }

    pub fn hooks_dir() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("hooks"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        tlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            tlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        if config.timebox.time == 0 {
            return Err(Error::ConfigInvalid(
                "timebox.time must be at least one minute".to_string(),
            ));
        }
        tlog_debug!(
            "Config loaded: refresh_rate={} data_location={} taskrc_location={}",
            config.refresh_rate,
            config.data_location,
            config.taskrc_location
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        tlog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Writes the defaults to `path` unless a file is already there.
    /// Returns whether a file was written.
    pub fn write_default_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        tlog!("Writing default config to {}", path.display());
        Self::default().save_to(path)?;
        Ok(true)
    }

    /// Creates `~/.tasksched` and its hooks directory.
    pub fn ensure_dirs() -> Result<()> {
        let hooks_dir = Self::hooks_dir()?;
        if !hooks_dir.exists() {
            tlog_debug!("Creating hooks directory: {}", hooks_dir.display());
            fs::create_dir_all(&hooks_dir)?;
        }
        Ok(())
    }

    /// The refresh interval never drops below one second.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_rate.max(1))
    }

    pub fn data_path(&self) -> PathBuf {
        expand_tilde(&self.data_location)
    }

    pub fn taskrc_path(&self) -> PathBuf {
        expand_tilde(&self.taskrc_location)
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

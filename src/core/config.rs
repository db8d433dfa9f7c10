//! Settings file for the shape service
//!
//! Stored as pretty-printed JSON with kebab-case keys. Every field has a
//! default so a partial or missing file still yields a usable configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// Default per-owner sample budget
pub const DEFAULT_PARTICLE_LIMIT: u64 = 10_000;

/// Runtime settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Maximum total samples a single owner's shapes may sum to
    pub particle_limit: u64,
    /// Directory holding one shape file per owner
    pub data_dir: PathBuf,
    /// Worlds the host reports as loaded
    pub worlds: Vec<String>,
    /// Delay before the first render tick (ms)
    pub render_delay_ms: u64,
    /// Interval between render ticks (ms)
    pub render_interval_ms: u64,
    /// Size passed to the sample sink for every sample
    pub sample_size: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            particle_limit: DEFAULT_PARTICLE_LIMIT,
            data_dir: PathBuf::from("playerdata"),
            worlds: vec!["world".to_string()],
            render_delay_ms: 1000,   // 20 server ticks
            render_interval_ms: 500, // 10 server ticks
            sample_size: 1.5,
        }
    }
}

impl Settings {
    /// Parse settings from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.render_interval_ms == 0 {
            return Err(Error::Config("render-interval-ms must be positive".into()));
        }
        if !(self.sample_size.is_finite() && self.sample_size > 0.0) {
            return Err(Error::Config(format!("sample-size {} must be positive", self.sample_size)));
        }
        Ok(())
    }
}

/// Settings bound to the file they were loaded from
pub struct ConfigFile {
    path: PathBuf,
    settings: Settings,
}

impl ConfigFile {
    /// Open the settings file, writing defaults if it does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            let settings = Self::read(&path)?;
            Ok(Self { path, settings })
        } else {
            let file = Self { path, settings: Settings::default() };
            file.save()?;
            log::info!("Wrote default settings to {}", file.path.display());
            Ok(file)
        }
    }

    fn read(path: &Path) -> Result<Settings> {
        let json = std::fs::read_to_string(path)?;
        Settings::from_json(&json)
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file. On failure the previous settings stay in effect.
    pub fn reload(&mut self) -> Result<&Settings> {
        self.settings = Self::read(&self.path)?;
        log::info!("Reloaded settings (particle limit {})", self.settings.particle_limit);
        Ok(&self.settings)
    }

    /// Change the particle limit and persist it
    pub fn set_particle_limit(&mut self, limit: u64) -> Result<()> {
        self.settings.particle_limit = limit;
        self.save()
    }

    /// Write the current settings back to disk
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

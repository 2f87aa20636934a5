//! Worker settings file
//!
//! `settings.toml` holds the progress reporting defaults applied to new controllers:
//!
//! ```toml
//! reporting = true
//! overall_step = 1
//! file_step = 5
//! cancel_check_step = 5
//! ```

use crate::models::progress::{
    ReportSettings, DEFAULT_CANCEL_CHECK_STEP, DEFAULT_FILE_STEP, DEFAULT_OVERALL_STEP,
};
use crate::utils::error::{Result, ZipWorkerError};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the settings file location
pub const SETTINGS_ENV: &str = "ZIPWORKER_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub reporting: bool,
    pub overall_step: u32,
    pub file_step: u32,
    pub cancel_check_step: u32,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            reporting: false,
            overall_step: DEFAULT_OVERALL_STEP,
            file_step: DEFAULT_FILE_STEP,
            cancel_check_step: DEFAULT_CANCEL_CHECK_STEP,
        }
    }
}

impl WorkerSettings {
    /// Default location: `$ZIPWORKER_CONFIG`, else `<config dir>/zipworker/settings.toml`
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(custom) = env::var(SETTINGS_ENV) {
            let trimmed = custom.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        dirs::config_dir().map(|dir| dir.join("zipworker").join("settings.toml"))
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        Self::parse(&data).map_err(|e| {
            ZipWorkerError::Config(format!("{}: {}", path.display(), e))
        })
    }

    pub fn parse(data: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(data)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = toml::to_string_pretty(self)
            .map_err(|e| ZipWorkerError::Config(e.to_string()))?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Reporting settings with every step clamped to [1, 100]
    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings::new(
            self.reporting,
            self.overall_step,
            self.file_step,
            self.cancel_check_step,
        )
    }
}

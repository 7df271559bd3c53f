//! Engine settings
//!
//! Defaults, then an optional JSON settings file, then environment
//! overrides. The CLI applies its own flags on top.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};

use crate::constants::{config as paths, validation};

pub const ENV_PREFS: &str = "APP_SETTINGS_PREFS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_SDK: &str = "APP_SETTINGS_SDK";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Preference file the engine reads overrides from
    #[serde(default = "default_prefs_path")]
    pub prefs_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Host API level assumed by the simulated host
    #[serde(default = "default_sdk_int")]
    pub sdk_int: u32,
}

fn app_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(paths::APP_DIR);
    path
}

fn default_prefs_path() -> PathBuf {
    app_dir().join(paths::PREFS_FILENAME)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sdk_int() -> u32 {
    crate::constants::host::API_DISPLAY_INFO
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefs_path: default_prefs_path(),
            log_level: default_log_level(),
            sdk_int: default_sdk_int(),
        }
    }
}

/// Map a level name to a tracing level
pub fn parse_level(name: &str) -> Option<Level> {
    match name.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

impl Settings {
    pub fn path() -> PathBuf {
        app_dir().join(paths::FILENAME)
    }

    /// Load from the default location with environment overrides
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&Self::path())?;
        settings.apply_overrides(|name| env::var(name).ok());
        settings.validate_and_clamp();
        Ok(settings)
    }

    /// Read a settings file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {:?}", path))?;

        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Apply overrides from `lookup` (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_PREFS).filter(|p| !p.is_empty()) {
            self.prefs_path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(sdk) = lookup(ENV_SDK) {
            match sdk.trim().parse() {
                Ok(sdk) => self.sdk_int = sdk,
                Err(e) => {
                    warn!(var = ENV_SDK, value = %sdk, error = %e, "Ignoring unparsable API level")
                }
            }
        }
    }

    /// Clamp values into supported ranges
    pub fn validate_and_clamp(&mut self) {
        if self.sdk_int < validation::MIN_SDK_INT {
            warn!(
                sdk_int = self.sdk_int,
                min = validation::MIN_SDK_INT,
                "sdk_int below minimum, clamping"
            );
            self.sdk_int = validation::MIN_SDK_INT;
        } else if self.sdk_int > validation::MAX_SDK_INT {
            warn!(
                sdk_int = self.sdk_int,
                max = validation::MAX_SDK_INT,
                "sdk_int exceeds maximum, clamping"
            );
            self.sdk_int = validation::MAX_SDK_INT;
        }

        match parse_level(&self.log_level) {
            Some(level) => self.log_level = level.to_string().to_lowercase(),
            None => {
                warn!(log_level = %self.log_level, "Unknown log level, using info");
                self.log_level = default_log_level();
            }
        }
    }

    pub fn tracing_level(&self) -> Level {
        parse_level(&self.log_level).unwrap_or(Level::INFO)
    }
}

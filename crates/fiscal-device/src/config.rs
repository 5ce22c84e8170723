//! # Fiscal Configuration
//!
//! Configuration management for bill issuance.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FISCAL_UTC_OFFSET=+01:00                                           │
//! │     FISCAL_PAYMENT_ATTEMPTS=3                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/fiscal-pos/fiscal.toml (Linux)                           │
//! │     ~/Library/Application Support/com.fiscal.pos/fiscal.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     West Africa Time (+01:00), 3 payment attempts                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # fiscal.toml
//! [device]
//! name = "Caisse 1"
//!
//! [fiscal]
//! utc_offset = "+01:00"   # device clock zone, no DST
//! payment_attempts = 3    # submissions per payment before moving on
//! ```

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{DeviceError, DeviceResult};
use crate::protocol::DEFAULT_PAYMENT_ATTEMPTS;

// =============================================================================
// Device Configuration
// =============================================================================

/// Identification of the fiscal device this host drives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Human-readable device name, recorded on bill issuance log events.
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "Fiscal Device".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Fiscal Settings
// =============================================================================

/// Protocol behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiscalSettings {
    /// Zone of every timestamp the device emits, as `+HH:MM` / `-HH:MM`.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    /// Total submissions of one payment while the device does not accept
    /// it. Must be at least 1.
    #[serde(default = "default_payment_attempts")]
    pub payment_attempts: u32,
}

fn default_utc_offset() -> String {
    "+01:00".to_string()
}

fn default_payment_attempts() -> u32 {
    DEFAULT_PAYMENT_ATTEMPTS
}

impl Default for FiscalSettings {
    fn default() -> Self {
        FiscalSettings {
            utc_offset: default_utc_offset(),
            payment_attempts: default_payment_attempts(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete fiscal configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FiscalConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub fiscal: FiscalSettings,
}

impl FiscalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (fiscal.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DeviceResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading fiscal config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load fiscal config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> DeviceResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DeviceError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Fiscal config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DeviceResult<()> {
        parse_utc_offset(&self.fiscal.utc_offset)?;

        if self.fiscal.payment_attempts == 0 {
            return Err(DeviceError::Config(
                "payment_attempts must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value (the process environment in [`load`](Self::load)).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("FISCAL_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Some(offset) = lookup("FISCAL_UTC_OFFSET") {
            debug!(offset = %offset, "Overriding UTC offset from environment");
            self.fiscal.utc_offset = offset;
        }

        if let Some(attempts) = lookup("FISCAL_PAYMENT_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(n) => self.fiscal.payment_attempts = n,
                Err(_) => warn!(value = %attempts, "Ignoring non-numeric FISCAL_PAYMENT_ATTEMPTS"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "fiscal", "pos")
            .map(|dirs| dirs.config_dir().join("fiscal.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Fiscal timezone, passed explicitly to every timestamp decode.
    pub fn timezone(&self) -> DeviceResult<FixedOffset> {
        parse_utc_offset(&self.fiscal.utc_offset)
    }

    pub fn payment_attempts(&self) -> u32 {
        self.fiscal.payment_attempts
    }
}

/// Parses `+HH:MM` or `-HH:MM` into a fixed offset.
fn parse_utc_offset(raw: &str) -> DeviceResult<FixedOffset> {
    let invalid = || DeviceError::Config(format!("utc_offset must look like +HH:MM, got '{raw}'"));

    let raw = raw.trim();
    let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

//! Application settings loaded from `stockkeeper.toml`.
//!
//! Every field has a default, so a missing file yields a working configuration.
//! The alert recipient can also come from the `STOCKKEEPER_ALERT_RECIPIENT`
//! environment variable, which wins over the file.

use crate::core::alert::LOW_STOCK_THRESHOLD;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default settings file name, looked up in the working directory.
pub const DEFAULT_SETTINGS_PATH: &str = "stockkeeper.toml";

const RECIPIENT_ENV: &str = "STOCKKEEPER_ALERT_RECIPIENT";

/// Runtime settings for the ledger, alerts and exports
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Sales leaving fewer units than this trigger a low-stock alert
    pub low_stock_threshold: i64,
    /// Address that receives low-stock alerts
    pub alert_recipient: String,
    /// Symbol prefixed to monetary values in exports
    pub currency_symbol: String,
    /// Image reference used when an item has none
    pub default_image_reference: String,
    /// Length of the trailing window used when a report has no dates
    pub report_window_days: i64,
    /// Directory CSV exports are written to
    pub export_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            low_stock_threshold: LOW_STOCK_THRESHOLD,
            alert_recipient: "inventory@localhost".to_string(),
            currency_symbol: "$".to_string(),
            default_image_reference: "default_beverage.png".to_string(),
            report_window_days: 30,
            export_dir: PathBuf::from("exports"),
        }
    }
}

impl Settings {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    /// Returns `Error::Config` if the TOML is invalid or a value is out of range.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: Self = toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse settings: {e}"),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.low_stock_threshold < 0 {
            return Err(Error::Config {
                message: "low_stock_threshold cannot be negative".to_string(),
            });
        }
        if self.report_window_days <= 0 {
            return Err(Error::Config {
                message: "report_window_days must be positive".to_string(),
            });
        }
        Ok(())
    }

    fn apply_env_overrides(mut self) -> Self {
        if let Ok(recipient) = std::env::var(RECIPIENT_ENV) {
            if !recipient.trim().is_empty() {
                self.alert_recipient = recipient.trim().to_string();
            }
        }
        self
    }
}

/// Loads settings from a TOML file, falling back to defaults when it does not exist.
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid
/// - A value is out of range
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    let settings = if path_ref.exists() {
        debug!("Loading settings from {:?}", path_ref);
        let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
            message: format!("Failed to read settings file {path_ref:?}: {e}"),
        })?;
        Settings::from_toml_str(&contents)?
    } else {
        info!("No settings file at {:?}, using defaults", path_ref);
        Settings::default()
    };
    Ok(settings.apply_env_overrides())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_partial_settings() {
        let toml_str = r#"
            alert_recipient = "owner@example.com"
            currency_symbol = "€"
        "#;

        let settings = Settings::from_toml_str(toml_str).unwrap();
        assert_eq!(settings.alert_recipient, "owner@example.com");
        assert_eq!(settings.currency_symbol, "€");
        assert_eq!(settings.low_stock_threshold, 5);
        assert_eq!(settings.report_window_days, 30);
        assert_eq!(settings.default_image_reference, "default_beverage.png");
    }

    #[test]
    fn test_rejects_bad_window() {
        let result = Settings::from_toml_str("report_window_days = 0");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_rejects_invalid_toml() {
        let result = Settings::from_toml_str("low_stock_threshold = \"five\"");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let settings = load_settings("definitely/not/here.toml").unwrap();
        assert_eq!(settings.low_stock_threshold, 5);
        assert_eq!(settings.export_dir, PathBuf::from("exports"));
    }
}

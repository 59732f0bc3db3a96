//! # Engine Configuration
//!
//! Database location, number formats, rounding mode and the tax table.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BILLBOOK_DB_PATH=/data/billbook.db                                 │
//! │     BILLBOOK_INVOICE_PREFIX=INV-   BILLBOOK_QUOTE_PREFIX=QUO-          │
//! │     BILLBOOK_NUMBER_WIDTH=5        BILLBOOK_ROUNDING=half_even         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/billbook/billbook.toml (Linux)                           │
//! │     ~/Library/Application Support/com.billbook.billbook/billbook.toml  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     INV-/QUO- with 4 digits, half-up, NONE = 0%, GST = 10%             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "billbook.db"
//!
//! [numbering.invoice]
//! prefix = "INV-"
//! width = 4
//!
//! [numbering.quote]
//! prefix = "QUO-"
//! width = 4
//!
//! [pricing]
//! rounding = "half_up"   # half_up | half_even
//!
//! [tax]                  # percent per tax code
//! NONE = 0.0
//! GST = 10.0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;
use billbook_core::validation::validate_tax_table;
use billbook_core::{NumberFormats, PricingEngine, RoundingMode, TaxCode, TaxRate, TaxRateTable};

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Relative paths resolve against the working directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "billbook", "billbook")
        .map(|dirs| dirs.data_dir().join("billbook.db"))
        .unwrap_or_else(|| PathBuf::from("billbook.db"))
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
        }
    }
}

/// `[pricing]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PricingSettings {
    #[serde(default)]
    pub rounding: RoundingMode,
}

// =============================================================================
// Engine Config
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub numbering: NumberFormats,

    #[serde(default)]
    pub pricing: PricingSettings,

    /// Tax code to percent, as typed on the tax settings screen.
    #[serde(default = "default_tax_percentages")]
    pub tax: BTreeMap<String, f64>,
}

fn default_tax_percentages() -> BTreeMap<String, f64> {
    TaxRateTable::standard()
        .iter()
        .map(|(code, rate)| (code.to_string(), rate.percentage()))
        .collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database: DatabaseSettings::default(),
            numbering: NumberFormats::default(),
            pricing: PricingSettings::default(),
            tax: default_tax_percentages(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (billbook.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document; missing sections take their defaults.
    pub fn from_toml(contents: &str) -> DbResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    ///
    /// ## Rules
    /// - Prefixes non-empty and distinct, width 1..=12
    /// - Every tax rate within 0..=100%
    /// - No two `[tax]` keys for the same code (`gst` and `GST`)
    pub fn validate(&self) -> DbResult<()> {
        self.numbering
            .validate()
            .map_err(|e| DbError::InvalidConfig(e.to_string()))?;

        let mut seen = HashMap::new();
        for (code, pct) in &self.tax {
            if let Some(other) = seen.insert(TaxCode::from(code.as_str()), code) {
                return Err(DbError::InvalidConfig(format!(
                    "tax codes '{}' and '{}' name the same rate",
                    other, code
                )));
            }
            if !pct.is_finite() || *pct < 0.0 || *pct > 100.0 {
                return Err(DbError::InvalidConfig(format!(
                    "tax rate for {} must be between 0 and 100, got {}",
                    code, pct
                )));
            }
        }

        validate_tax_table(&self.tax_table()).map_err(|e| DbError::InvalidConfig(e.to_string()))?;

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("BILLBOOK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(prefix) = std::env::var("BILLBOOK_INVOICE_PREFIX") {
            self.numbering.invoice.prefix = prefix;
        }

        if let Ok(prefix) = std::env::var("BILLBOOK_QUOTE_PREFIX") {
            self.numbering.quote.prefix = prefix;
        }

        if let Ok(width) = std::env::var("BILLBOOK_NUMBER_WIDTH") {
            match width.parse::<usize>() {
                Ok(w) => {
                    self.numbering.invoice.width = w;
                    self.numbering.quote.width = w;
                }
                Err(_) => warn!(width = %width, "Ignoring non-numeric BILLBOOK_NUMBER_WIDTH"),
            }
        }

        if let Ok(mode) = std::env::var("BILLBOOK_ROUNDING") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding rounding mode from environment");
                    self.pricing.rounding = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown rounding mode in environment"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "billbook", "billbook")
            .map(|dirs| dirs.config_dir().join("billbook.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Database settings for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
    }

    /// The tax table in basis points.
    pub fn tax_table(&self) -> TaxRateTable {
        self.tax
            .iter()
            .map(|(code, pct)| (TaxCode::from(code.as_str()), TaxRate::from_percentage(*pct)))
            .collect()
    }

    /// A pricing engine using the configured rounding mode.
    pub fn pricing_engine(&self) -> PricingEngine {
        PricingEngine::new(self.pricing.rounding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbook_core::DocumentKind;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.numbering.invoice.format(42), "INV-0042");
        assert_eq!(config.pricing.rounding, RoundingMode::HalfUp);
        assert_eq!(config.tax_table(), TaxRateTable::standard());
    }

    #[test]
    fn test_toml_parsing() {
        let config = EngineConfig::from_toml(
            r#"
            [database]
            path = "/srv/billbook/data.db"

            [numbering.invoice]
            prefix = "F-"
            width = 6

            [numbering.quote]
            prefix = "D-"
            width = 3

            [pricing]
            rounding = "half_even"

            [tax]
            GST = 15.0
            vat20 = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/srv/billbook/data.db"));
        assert_eq!(config.numbering.get(DocumentKind::Invoice).format(7), "F-000007");
        assert_eq!(config.numbering.get(DocumentKind::Quote).format(7), "D-007");
        assert_eq!(config.pricing_engine().rounding(), RoundingMode::HalfEven);

        let table = config.tax_table();
        assert_eq!(table.get(&TaxCode::Gst), Some(TaxRate::from_bps(1500)));
        assert_eq!(table.get(&TaxCode::from("VAT20")), Some(TaxRate::from_bps(2000)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml("[pricing]\nrounding = \"half_up\"\n").unwrap();

        assert_eq!(config.numbering, NumberFormats::default());
        assert_eq!(config.tax_table(), TaxRateTable::standard());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.numbering.quote.prefix = "INV-".to_string();
        assert!(matches!(config.validate(), Err(DbError::InvalidConfig(_))));

        let mut config = EngineConfig::default();
        config.numbering.invoice.width = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.tax.insert("PST".to_string(), 120.0);
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.tax.insert("PST".to_string(), -1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tax_keys_differing_only_in_case_rejected() {
        let config = EngineConfig::from_toml("[tax]\ngst = 10.0\nGST = 15.0\n").unwrap();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(ref msg) if msg.contains("gst")));

        let config = EngineConfig::from_toml("[tax]\nnone = 0.0\n\"\" = 0.0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = EngineConfig::from_toml("[numbering.invoice\nprefix = 1").unwrap_err();
        assert!(matches!(err, DbError::ConfigLoadFailed(_)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("billbook-missing-{}.toml", uuid::Uuid::new_v4()));
        let config = EngineConfig::load(Some(path)).unwrap();

        assert_eq!(config.numbering, NumberFormats::default());
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::{LedgerOptions, Vocabulary};
use crate::portfolio::{Granularity, DEFAULT_FX_RATE, DEFAULT_INTRADAY_HOURS};

fn default_ledger_path() -> PathBuf {
    PathBuf::from("Account.csv")
}

fn default_tickers_path() -> PathBuf {
    PathBuf::from("tickers.csv")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_home_currency() -> String {
    "EUR".to_string()
}

fn default_foreign_currency() -> String {
    "USD".to_string()
}

fn default_fx_rate() -> Decimal {
    DEFAULT_FX_RATE
}

/// Which timestamps a history run values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Hours of day to sample. Empty means one end-of-day point per day.
    pub hours: Vec<u32>,

    /// First day to value. Defaults to the first ledger entry.
    pub start: Option<NaiveDate>,

    /// Last day to value. Defaults to today.
    pub end: Option<NaiveDate>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            hours: DEFAULT_INTRADAY_HOURS.to_vec(),
            start: None,
            end: None,
        }
    }
}

impl TimelineConfig {
    pub fn granularity(&self) -> Granularity {
        if self.hours.is_empty() {
            Granularity::EndOfDay
        } else {
            Granularity::Intraday(self.hours.clone())
        }
    }
}

/// Market-data source settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    /// Override for the chart API base URL.
    pub base_url: Option<String>,

    /// Maximum concurrent series fetches.
    pub concurrency: usize,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            concurrency: 4,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker account export. If relative, resolved from config file location.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// `Product,Ticker,USD` mapping file.
    #[serde(default = "default_tickers_path")]
    pub tickers_path: PathBuf,

    /// Where report CSVs are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Currency all values are reported in.
    #[serde(default = "default_home_currency")]
    pub home_currency: String,

    /// Currency of foreign-quoted products.
    #[serde(default = "default_foreign_currency")]
    pub foreign_currency: String,

    /// Home units per foreign unit when no FX sample is available.
    #[serde(default = "default_fx_rate")]
    pub default_fx_rate: Decimal,

    #[serde(default)]
    pub timeline: TimelineConfig,

    #[serde(default)]
    pub vocabulary: Vocabulary,

    #[serde(default)]
    pub market_data: MarketDataConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            tickers_path: default_tickers_path(),
            output_dir: default_output_dir(),
            home_currency: default_home_currency(),
            foreign_currency: default_foreign_currency(),
            default_fx_rate: default_fx_rate(),
            timeline: TimelineConfig::default(),
            vocabulary: Vocabulary::default(),
            market_data: MarketDataConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn resolve(self, config_dir: &Path) -> ResolvedConfig {
        ResolvedConfig {
            ledger_path: resolve_path(config_dir, &self.ledger_path),
            tickers_path: resolve_path(config_dir, &self.tickers_path),
            output_dir: resolve_path(config_dir, &self.output_dir),
            home_currency: self.home_currency.to_uppercase(),
            foreign_currency: self.foreign_currency.to_uppercase(),
            default_fx_rate: self.default_fx_rate,
            timeline: self.timeline,
            vocabulary: self.vocabulary,
            market_data: self.market_data,
        }
    }
}

/// Relative paths are taken from `config_dir`.
pub fn resolve_path(config_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        config_dir.join(path)
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub ledger_path: PathBuf,
    pub tickers_path: PathBuf,
    pub output_dir: PathBuf,
    pub home_currency: String,
    pub foreign_currency: String,
    pub default_fx_rate: Decimal,
    pub timeline: TimelineConfig,
    pub vocabulary: Vocabulary,
    pub market_data: MarketDataConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./replaybook.toml` if it exists in current directory
/// 2. `~/.local/share/replaybook/replaybook.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("replaybook.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("replaybook").join("replaybook.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// Paths are resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        Ok(Config::load(&config_path)?.resolve(config_dir))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, paths resolve against the file's intended directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Config::default().resolve(config_dir))
    }

    pub fn ledger_options(&self) -> LedgerOptions {
        LedgerOptions {
            vocabulary: self.vocabulary.clone(),
            home_currency: self.home_currency.clone(),
            foreign_currency: self.foreign_currency.clone(),
        }
    }
}

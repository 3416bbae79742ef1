use super::allocator::{AllocationModel, DEFAULT_SHIFT_PER_POINT};
use super::backtest::DEFAULT_NOTIONAL;
use super::category::AssetCategory;
use super::instrument::{Instrument, InstrumentRegistry};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AllocationConfig {
    #[serde(default = "default_shift_per_point")]
    pub shift_per_point: f64,
    #[serde(default)]
    pub base_weights: BTreeMap<AssetCategory, f64>,
}

fn default_shift_per_point() -> f64 {
    DEFAULT_SHIFT_PER_POINT
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            shift_per_point: DEFAULT_SHIFT_PER_POINT,
            base_weights: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BacktestConfig {
    #[serde(default = "default_notional")]
    pub notional: f64,
}

fn default_notional() -> f64 {
    DEFAULT_NOTIONAL
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            notional: DEFAULT_NOTIONAL,
        }
    }
}

fn default_currency() -> String {
    "KRW".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    pub instruments: Vec<Instrument>,
    #[serde(default)]
    pub watchlist: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "tiltfolio", "tiltfolio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Builds and validates the instrument registry.
    pub fn registry(&self) -> Result<InstrumentRegistry> {
        InstrumentRegistry::new(self.instruments.clone()).context("Invalid instrument registry")
    }

    pub fn allocation_model(&self) -> Result<AllocationModel> {
        AllocationModel::new(
            &self.allocation.base_weights,
            self.allocation.shift_per_point,
        )
        .context("Invalid allocation settings")
    }

    pub fn yahoo_base_url(&self) -> &str {
        self.providers
            .yahoo
            .as_ref()
            .map_or("https://query1.finance.yahoo.com", |p| &p.base_url)
    }
}

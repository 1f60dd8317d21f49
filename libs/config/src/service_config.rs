//! Service Configuration Module
//!
//! Loads [`DashboardConfig`] from built-in defaults, an optional TOML/JSON file
//! and `DASHBOARD__` prefixed environment variables, in that order.

use crate::defaults;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use types::{ChainClock, Currency};

/// Main service configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub server: ServerSettings,
    pub chain: ChainSettings,
    pub limits: LimitSettings,
    pub currency: CurrencySettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
    /// Allow cross-origin browser requests
    pub enable_cors: bool,
}

/// Beacon chain time parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ChainSettings {
    pub genesis_timestamp: u64,
    pub seconds_per_slot: u64,
    pub slots_per_epoch: u64,
    pub seconds_per_day: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LimitSettings {
    /// Limit for callers without a known tier
    pub default_max_validators: usize,
    /// Tier name -> maximum validators per request
    pub tiers: HashMap<String, usize>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CurrencySettings {
    /// Used when the caller selects nothing or an unsupported code
    pub default: String,
    /// Currency code -> display units per native coin
    pub rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StorageSettings {
    /// Postgres connection string; `${VAR}` references are expanded
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub query_timeout_ms: u64,
    /// How often the indexed head epoch is re-read
    pub latest_epoch_refresh_ms: u64,
    /// JSON file seeding the in-memory effectiveness store
    pub effectiveness_path: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: defaults::server::BIND_ADDRESS.to_string(),
            port: defaults::server::PORT,
            enable_cors: false,
        }
    }
}

impl Default for ChainSettings {
    fn default() -> Self {
        let clock = ChainClock::mainnet();
        Self {
            genesis_timestamp: clock.genesis_timestamp,
            seconds_per_slot: clock.seconds_per_slot,
            slots_per_epoch: clock.slots_per_epoch,
            seconds_per_day: clock.seconds_per_day,
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            default_max_validators: defaults::limits::DEFAULT_MAX_VALIDATORS,
            tiers: defaults::limits::TIERS
                .iter()
                .map(|(name, limit)| (name.to_string(), *limit))
                .collect(),
        }
    }
}

impl Default for CurrencySettings {
    fn default() -> Self {
        let default = defaults::currency::DEFAULT_CURRENCY.to_string();
        let rates = HashMap::from([(default.clone(), 1.0)]);
        Self { default, rates }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: defaults::storage::MAX_CONNECTIONS,
            query_timeout_ms: defaults::storage::QUERY_TIMEOUT_MS,
            latest_epoch_refresh_ms: defaults::storage::LATEST_EPOCH_REFRESH_MS,
            effectiveness_path: None,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults =
            Config::try_from(&Self::default()).context("Failed to serialize default configuration")?;

        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            info!("Loading dashboard config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables (DASHBOARD__SECTION__KEY)
        builder = builder.add_source(
            Environment::with_prefix("DASHBOARD")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.expand_env_vars()?;
        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Expand environment variables in string values
    pub fn expand_env_vars(&mut self) -> Result<()> {
        if let Some(url) = &self.storage.database_url {
            let expanded = shellexpand::env(url).context("Failed to expand database URL")?;
            self.storage.database_url = Some(expanded.to_string());
        }
        Ok(())
    }

    /// Startup check; a config that passes can serve every request
    pub fn validate(&self) -> Result<()> {
        let chain = &self.chain;
        if chain.seconds_per_slot == 0 || chain.slots_per_epoch == 0 || chain.seconds_per_day == 0
        {
            bail!("chain intervals must be positive: {:?}", chain);
        }

        if self.storage.query_timeout_ms == 0 || self.storage.latest_epoch_refresh_ms == 0 {
            bail!("storage timeouts and refresh intervals must be positive");
        }

        if self.limits.default_max_validators == 0 {
            bail!("limits.default_max_validators must be positive");
        }
        if let Some((tier, _)) = self.limits.tiers.iter().find(|(_, limit)| **limit == 0) {
            bail!("tier '{}' has a zero validator limit", tier);
        }

        for (code, rate) in &self.currency.rates {
            if !rate.is_finite() || *rate <= 0.0 {
                bail!("currency '{}' has invalid rate {}", code, rate);
            }
        }
        let default = Currency::new(&self.currency.default);
        let has_default_rate = self
            .currency
            .rates
            .keys()
            .any(|code| Currency::new(code) == default);
        if !has_default_rate {
            bail!("default currency '{}' has no rate", default);
        }

        Ok(())
    }

    pub fn chain_clock(&self) -> ChainClock {
        ChainClock::new(
            self.chain.genesis_timestamp,
            self.chain.seconds_per_slot,
            self.chain.slots_per_epoch,
            self.chain.seconds_per_day,
        )
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

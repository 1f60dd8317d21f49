//! # Validator Dashboard Configuration
//!
//! Centralized configuration for the dashboard service: server binding, chain
//! time parameters, per-tier validator limits, display currency rates and
//! storage settings.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dashboard_config::DashboardConfig;
//!
//! let config = DashboardConfig::load(Some("config/dashboard.toml".as_ref()))?;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Sources are layered: built-in defaults, then the optional file, then
//! `DASHBOARD__*` environment variables (`DASHBOARD__SERVER__PORT=9000`).

pub mod defaults;
pub mod service_config;

pub use service_config::{
    ChainSettings, CurrencySettings, DashboardConfig, LimitSettings, ServerSettings,
    StorageSettings,
};

//! Read-only collaborators: prices, caller tiers and the latest epoch
//!
//! All three are process-wide and read on every request. Writers are rare: a
//! price feed calling [`StaticPrices::set_rate`], and [`EpochRefresher`]
//! following the indexer's head.

use crate::store::{RelationalStore, StoreError, StoreResult};
use dashboard_config::{CurrencySettings, LimitSettings};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use types::{ChainClock, Currency, Epoch};
use uuid::Uuid;

/// Indexer lag, in epochs, beyond which each refresh warns
const MAX_EPOCH_LAG: Epoch = 2;

/// Per-request context handed to collaborators and used in log fields
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    /// Entitlement tier asserted by the upstream auth layer
    pub tier: Option<String>,
}

impl RequestContext {
    pub fn new(tier: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            tier,
        }
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }
}

/// Exchange rates: display units per native coin
pub trait PriceSource: Send + Sync {
    fn rate(&self, currency: &Currency) -> Option<f64>;
}

/// Rate table seeded from configuration
pub struct StaticPrices {
    rates: RwLock<HashMap<Currency, f64>>,
}

impl StaticPrices {
    pub fn new<'a>(rates: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let rates = rates
            .into_iter()
            .map(|(code, rate)| (Currency::new(code), rate))
            .collect();
        Self {
            rates: RwLock::new(rates),
        }
    }

    pub fn from_settings(settings: &CurrencySettings) -> Self {
        Self::new(settings.rates.iter().map(|(code, rate)| (code.as_str(), *rate)))
    }

    /// Replace one rate; used by an external price feed
    pub fn set_rate(&self, currency: Currency, rate: f64) {
        self.rates.write().insert(currency, rate);
    }
}

impl PriceSource for StaticPrices {
    fn rate(&self, currency: &Currency) -> Option<f64> {
        if currency.is_native() {
            return Some(1.0);
        }
        self.rates.read().get(currency).copied()
    }
}

/// Maximum validators a caller may request at once
pub trait TierPolicy: Send + Sync {
    fn max_validators(&self, ctx: &RequestContext) -> usize;
}

pub struct ConfiguredTiers {
    default_limit: usize,
    tiers: HashMap<String, usize>,
}

impl ConfiguredTiers {
    pub fn new(default_limit: usize, tiers: HashMap<String, usize>) -> Self {
        let tiers = tiers
            .into_iter()
            .map(|(name, limit)| (name.to_ascii_lowercase(), limit))
            .collect();
        Self {
            default_limit,
            tiers,
        }
    }

    pub fn from_settings(settings: &LimitSettings) -> Self {
        Self::new(settings.default_max_validators, settings.tiers.clone())
    }
}

impl TierPolicy for ConfiguredTiers {
    fn max_validators(&self, ctx: &RequestContext) -> usize {
        ctx.tier
            .as_deref()
            .and_then(|tier| self.tiers.get(&tier.trim().to_ascii_lowercase()))
            .copied()
            .unwrap_or(self.default_limit)
    }
}

pub trait LatestEpochSource: Send + Sync {
    fn latest_epoch(&self) -> Epoch;
}

/// Epoch published by an indexer
#[derive(Debug, Default)]
pub struct SharedLatestEpoch(AtomicU64);

impl SharedLatestEpoch {
    pub fn new(epoch: Epoch) -> Self {
        Self(AtomicU64::new(epoch))
    }

    pub fn set(&self, epoch: Epoch) {
        self.0.store(epoch, Ordering::Release);
    }
}

impl LatestEpochSource for SharedLatestEpoch {
    fn latest_epoch(&self) -> Epoch {
        self.0.load(Ordering::Acquire)
    }
}

/// Polls the relational store for the newest indexed epoch and publishes it
/// through a [`SharedLatestEpoch`]
pub struct EpochRefresher {
    store: Arc<dyn RelationalStore>,
    latest: Arc<SharedLatestEpoch>,
    clock: ChainClock,
    interval: Duration,
}

impl EpochRefresher {
    pub fn new(
        store: Arc<dyn RelationalStore>,
        latest: Arc<SharedLatestEpoch>,
        clock: ChainClock,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            latest,
            clock,
            interval,
        }
    }

    /// Read the head once. The published epoch is left alone when the store
    /// fails or has no epochs yet.
    pub async fn refresh(&self) -> StoreResult<Option<Epoch>> {
        let head = tokio::time::timeout(self.interval, self.store.latest_epoch())
            .await
            .map_err(|_| StoreError::Timeout(self.interval))??;

        match head {
            Some(epoch) => {
                self.latest.set(epoch);
                let lag = self.wall_clock_epoch().saturating_sub(epoch);
                if lag > MAX_EPOCH_LAG {
                    warn!(epoch, lag, "indexer is behind the chain clock");
                } else {
                    debug!(epoch, "latest epoch refreshed");
                }
            }
            None => warn!("relational store has no indexed epochs"),
        }
        Ok(head)
    }

    /// Epoch the chain clock says is in progress
    pub fn wall_clock_epoch(&self) -> Epoch {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        self.clock.epoch_at(now)
    }

    /// Refresh every interval until the task is dropped
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "latest epoch refresh failed");
            }
        }
    }
}

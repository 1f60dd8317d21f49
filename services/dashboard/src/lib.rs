//! Validator Dashboard Service
//!
//! Read-only aggregation over a relational chain store and a wide-column
//! metrics store. Parses caller-supplied validator sets, fans out bounded
//! queries, and shapes the results into the JSON the dashboard views render.

#![recursion_limit = "256"]

pub mod error;
pub mod orchestrator;
pub mod providers;
pub mod server;
pub mod service;
pub mod shaper;
pub mod store;

pub use error::{DashboardError, Result};
pub use orchestrator::{EffectivenessResult, QueryOrchestrator};
pub use providers::{
    ConfiguredTiers, EpochRefresher, LatestEpochSource, PriceSource, RequestContext,
    SharedLatestEpoch, StaticPrices, TierPolicy,
};
pub use server::{routes, DashboardServer};
pub use service::{Collaborators, DashboardQuery, DashboardService};
pub use shaper::{DisplayCurrency, ResponseShaper};
pub use store::{MemoryStore, RelationalStore, StoreError, WideColumnStore};

/// Re-export key types
pub use types::{ChainClock, Currency, IdentifierSet};

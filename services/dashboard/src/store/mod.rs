//! Backing store interfaces
//!
//! The dashboard reads from two independent stores: a relational store with
//! canonical chain state and daily rollups, and a wide-column store with
//! per-epoch performance metrics. Both are consumed through the narrow traits
//! below; adapters translate store-specific encodings (such as the far-future
//! epoch sentinel) before records leave the adapter.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use types::{
    DailyIncome, EarningsSnapshot, EffectivenessSample, Epoch, GraffitiwallPixel, IdentifierSet,
    ProposalHistoryRecord, ProposalRecord, ValidatorIndex, ValidatorRecord,
};

/// Opaque failure of a backing store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Canonical chain state and daily rollups
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Summed daily income of the set, ascending by day
    async fn income_history(&self, validators: &IdentifierSet) -> StoreResult<Vec<DailyIncome>>;

    /// Blocks proposed by the set, ascending by slot
    async fn proposals(&self, validators: &IdentifierSet) -> StoreResult<Vec<ProposalRecord>>;

    /// Validator rows with name and performance side data, at most `limit` rows
    async fn validator_snapshot(
        &self,
        validators: &IdentifierSet,
        limit: usize,
    ) -> StoreResult<Vec<ValidatorRecord>>;

    /// Members of the set active at `epoch`
    async fn active_validators(
        &self,
        validators: &IdentifierSet,
        epoch: Epoch,
    ) -> StoreResult<Vec<ValidatorIndex>>;

    /// Daily proposal rollups with at least one non-null count, descending by day
    async fn proposal_history(
        &self,
        validators: &IdentifierSet,
    ) -> StoreResult<Vec<ProposalHistoryRecord>>;

    /// Aggregate income of the set; `None` when nothing is tracked for it
    async fn earnings(&self, validators: &IdentifierSet) -> StoreResult<Option<EarningsSnapshot>>;

    async fn graffitiwall(&self) -> StoreResult<Vec<GraffitiwallPixel>>;

    /// Newest epoch the indexer has written; `None` on an empty chain
    async fn latest_epoch(&self) -> StoreResult<Option<Epoch>>;
}

/// Per-epoch performance metrics
#[async_trait]
pub trait WideColumnStore: Send + Sync {
    /// One sample per validator that has one for `epoch`, in request order
    async fn effectiveness(
        &self,
        validators: &[ValidatorIndex],
        epoch: Epoch,
    ) -> StoreResult<Vec<EffectivenessSample>>;
}

//! In-memory store
//!
//! Implements both store traits over plain tables with the same filters and
//! orderings as the SQL adapter. Used by tests and by local runs without a
//! database; the wide-column side can be seeded from a JSON file.

use super::{RelationalStore, StoreError, StoreResult, WideColumnStore};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;
use tracing::info;
use types::{
    DailyIncome, EarningsSnapshot, EffectivenessSample, Epoch, GraffitiwallPixel, IdentifierSet,
    ProposalHistoryRecord, ProposalRecord, ProposalStatus, ValidatorIndex, ValidatorRecord,
};

#[derive(Default)]
struct Tables {
    validators: Vec<ValidatorRecord>,
    /// pubkey -> registered name
    validator_names: HashMap<Vec<u8>, String>,
    /// index -> seven-day income
    validator_performance: HashMap<ValidatorIndex, i64>,
    epochs: Vec<Epoch>,
    blocks: Vec<ProposalRecord>,
    daily_income: Vec<(ValidatorIndex, DailyIncome)>,
    validator_stats: Vec<ProposalHistoryRecord>,
    earnings: HashMap<ValidatorIndex, EarningsSnapshot>,
    graffitiwall: Vec<GraffitiwallPixel>,
    effectiveness: Vec<EffectivenessSample>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failure: RwLock<Option<StoreError>>,
    latency: RwLock<Option<Duration>>,
    query_failures: RwLock<HashMap<&'static str, StoreError>>,
    query_latency: RwLock<HashMap<&'static str, Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_validator(&self, record: ValidatorRecord) {
        self.tables.write().validators.push(record);
    }

    pub fn insert_validator_name(&self, pubkey: Vec<u8>, name: &str) {
        self.tables
            .write()
            .validator_names
            .insert(pubkey, name.to_string());
    }

    pub fn set_performance(&self, validator: ValidatorIndex, performance_7d: i64) {
        self.tables
            .write()
            .validator_performance
            .insert(validator, performance_7d);
    }

    /// Record an epoch as indexed
    pub fn insert_epoch(&self, epoch: Epoch) {
        self.tables.write().epochs.push(epoch);
    }

    pub fn insert_block(&self, record: ProposalRecord) {
        self.tables.write().blocks.push(record);
    }

    pub fn insert_daily_income(&self, validator: ValidatorIndex, income: DailyIncome) {
        self.tables.write().daily_income.push((validator, income));
    }

    pub fn insert_validator_stats(&self, record: ProposalHistoryRecord) {
        self.tables.write().validator_stats.push(record);
    }

    pub fn set_earnings(&self, validator: ValidatorIndex, snapshot: EarningsSnapshot) {
        self.tables.write().earnings.insert(validator, snapshot);
    }

    pub fn insert_graffiti(&self, pixel: GraffitiwallPixel) {
        self.tables.write().graffitiwall.push(pixel);
    }

    pub fn insert_effectiveness(&self, sample: EffectivenessSample) {
        self.tables.write().effectiveness.push(sample);
    }

    /// Make every following query fail with `error` (`None` clears it)
    pub fn set_failure(&self, error: Option<StoreError>) {
        *self.failure.write() = error;
    }

    /// Delay every following query by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Make only `query` fail, named after the store trait method
    pub fn fail_query(&self, query: &'static str, error: StoreError) {
        self.query_failures.write().insert(query, error);
    }

    /// Delay only `query`, named after the store trait method
    pub fn delay_query(&self, query: &'static str, latency: Duration) {
        self.query_latency.write().insert(query, latency);
    }

    /// Seed effectiveness samples from a JSON array file
    pub async fn load_effectiveness_file(&self, path: &Path) -> Result<usize> {
        let contents = tokio::fs::read_to_string(path).await?;
        let samples: Vec<EffectivenessSample> = serde_json::from_str(&contents)?;
        let count = samples.len();

        self.tables.write().effectiveness.extend(samples);
        info!("Loaded {} effectiveness samples from {:?}", count, path);
        Ok(count)
    }

    async fn before_query(&self, query: &'static str) -> StoreResult<()> {
        let latency = self
            .query_latency
            .read()
            .get(query)
            .copied()
            .or(*self.latency.read());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let failure = self
            .query_failures
            .read()
            .get(query)
            .cloned()
            .or_else(|| self.failure.read().clone());
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RelationalStore for MemoryStore {
    async fn income_history(&self, validators: &IdentifierSet) -> StoreResult<Vec<DailyIncome>> {
        self.before_query("income_history").await?;
        let tables = self.tables.read();

        let mut by_day: BTreeMap<u64, i64> = BTreeMap::new();
        for (validator, income) in &tables.daily_income {
            if validators.contains(*validator) {
                *by_day.entry(income.day).or_default() += income.income;
            }
        }

        Ok(by_day
            .into_iter()
            .map(|(day, income)| DailyIncome { day, income })
            .collect())
    }

    async fn proposals(&self, validators: &IdentifierSet) -> StoreResult<Vec<ProposalRecord>> {
        self.before_query("proposals").await?;
        let tables = self.tables.read();

        let mut proposals: Vec<ProposalRecord> = tables
            .blocks
            .iter()
            .filter(|b| validators.contains(b.proposer))
            .copied()
            .collect();
        proposals.sort_by_key(|b| b.slot);
        Ok(proposals)
    }

    async fn validator_snapshot(
        &self,
        validators: &IdentifierSet,
        limit: usize,
    ) -> StoreResult<Vec<ValidatorRecord>> {
        self.before_query("validator_snapshot").await?;
        let tables = self.tables.read();

        let count_blocks = |index: ValidatorIndex, status: ProposalStatus| {
            tables
                .blocks
                .iter()
                .filter(|b| b.proposer == index && b.status == status)
                .count() as u64
        };

        Ok(tables
            .validators
            .iter()
            .filter(|v| validators.contains(v.index))
            .take(limit)
            .map(|v| {
                let mut record = v.clone();
                record.name = tables
                    .validator_names
                    .get(&v.pubkey)
                    .cloned()
                    .unwrap_or_default();
                record.performance_7d = tables
                    .validator_performance
                    .get(&v.index)
                    .copied()
                    .unwrap_or(0);
                record.executed_proposals = count_blocks(v.index, ProposalStatus::Executed);
                record.missed_proposals = count_blocks(v.index, ProposalStatus::Missed);
                record
            })
            .collect())
    }

    async fn active_validators(
        &self,
        validators: &IdentifierSet,
        epoch: Epoch,
    ) -> StoreResult<Vec<ValidatorIndex>> {
        self.before_query("active_validators").await?;
        let tables = self.tables.read();

        Ok(tables
            .validators
            .iter()
            .filter(|v| validators.contains(v.index) && v.is_active_at(epoch))
            .map(|v| v.index)
            .collect())
    }

    async fn proposal_history(
        &self,
        validators: &IdentifierSet,
    ) -> StoreResult<Vec<ProposalHistoryRecord>> {
        self.before_query("proposal_history").await?;
        let tables = self.tables.read();

        let mut rows: Vec<ProposalHistoryRecord> = tables
            .validator_stats
            .iter()
            .filter(|r| validators.contains(r.validator_index) && r.has_counts())
            .copied()
            .collect();
        rows.sort_by(|a, b| b.day.cmp(&a.day));
        Ok(rows)
    }

    async fn earnings(&self, validators: &IdentifierSet) -> StoreResult<Option<EarningsSnapshot>> {
        self.before_query("earnings").await?;
        let tables = self.tables.read();

        let tracked: Vec<&EarningsSnapshot> = validators
            .iter()
            .filter_map(|index| tables.earnings.get(index))
            .collect();
        if tracked.is_empty() {
            return Ok(None);
        }

        Ok(Some(tracked.into_iter().fold(
            EarningsSnapshot::default(),
            |acc, e| EarningsSnapshot {
                last_day: acc.last_day.saturating_add(e.last_day),
                last_week: acc.last_week.saturating_add(e.last_week),
                last_month: acc.last_month.saturating_add(e.last_month),
                total: acc.total.saturating_add(e.total),
                total_deposits: acc.total_deposits.saturating_add(e.total_deposits),
            },
        )))
    }

    async fn graffitiwall(&self) -> StoreResult<Vec<GraffitiwallPixel>> {
        self.before_query("graffitiwall").await?;
        Ok(self.tables.read().graffitiwall.clone())
    }

    async fn latest_epoch(&self) -> StoreResult<Option<Epoch>> {
        self.before_query("latest_epoch").await?;
        Ok(self.tables.read().epochs.iter().max().copied())
    }
}

#[async_trait]
impl WideColumnStore for MemoryStore {
    async fn effectiveness(
        &self,
        validators: &[ValidatorIndex],
        epoch: Epoch,
    ) -> StoreResult<Vec<EffectivenessSample>> {
        self.before_query("effectiveness").await?;
        let tables = self.tables.read();

        Ok(validators
            .iter()
            .filter_map(|index| {
                tables
                    .effectiveness
                    .iter()
                    .find(|s| s.validator_index == *index && s.epoch == epoch)
                    .copied()
            })
            .collect())
    }
}

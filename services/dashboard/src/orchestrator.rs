//! Multi-source query orchestration
//!
//! Issues the minimal set of store queries for each dashboard view. Every
//! store call runs under the configured deadline; any failure or timeout
//! aborts the whole request as [`DashboardError::DataSourceUnavailable`].
//! No retries happen here.

use crate::error::{DashboardError, Result};
use crate::store::{RelationalStore, StoreError, StoreResult, WideColumnStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use types::{
    DailyIncome, EarningsSnapshot, EffectivenessSample, Epoch, GraffitiwallPixel, IdentifierSet,
    ProposalHistoryRecord, ProposalRecord, ValidatorIndex, ValidatorRecord,
};

/// Active subset of a request and its effectiveness samples
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivenessResult {
    pub active: Vec<ValidatorIndex>,
    pub samples: Vec<EffectivenessSample>,
}

#[derive(Clone)]
pub struct QueryOrchestrator {
    relational: Arc<dyn RelationalStore>,
    metrics: Arc<dyn WideColumnStore>,
    query_timeout: Duration,
}

impl QueryOrchestrator {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        metrics: Arc<dyn WideColumnStore>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            relational,
            metrics,
            query_timeout,
        }
    }

    async fn run<T, F>(&self, query: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let result = tokio::time::timeout(self.query_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.query_timeout))?;

        match result {
            Ok(rows) => {
                debug!(query, "store query completed");
                Ok(rows)
            }
            Err(e) => Err(DashboardError::DataSourceUnavailable(e)),
        }
    }

    pub async fn income_history(&self, validators: &IdentifierSet) -> Result<Vec<DailyIncome>> {
        self.run("income_history", self.relational.income_history(validators))
            .await
    }

    pub async fn proposals(&self, validators: &IdentifierSet) -> Result<Vec<ProposalRecord>> {
        self.run("proposals", self.relational.proposals(validators))
            .await
    }

    /// `limit` bounds the rows again even though the set is already bounded
    pub async fn validator_snapshot(
        &self,
        validators: &IdentifierSet,
        limit: usize,
    ) -> Result<Vec<ValidatorRecord>> {
        self.run(
            "validator_snapshot",
            self.relational.validator_snapshot(validators, limit),
        )
        .await
    }

    /// Two dependent phases: resolve the active subset at `latest_epoch`, then
    /// read its samples for the last completed epoch.
    pub async fn effectiveness(
        &self,
        validators: &IdentifierSet,
        latest_epoch: Epoch,
    ) -> Result<EffectivenessResult> {
        let active = self
            .run(
                "active_validators",
                self.relational.active_validators(validators, latest_epoch),
            )
            .await?;

        if active.is_empty() {
            return Err(DashboardError::NoActiveValidators);
        }

        let completed_epoch = latest_epoch.saturating_sub(1);
        let samples = self
            .run(
                "effectiveness",
                self.metrics.effectiveness(&active, completed_epoch),
            )
            .await?;

        Ok(EffectivenessResult { active, samples })
    }

    pub async fn proposal_history(
        &self,
        validators: &IdentifierSet,
    ) -> Result<Vec<ProposalHistoryRecord>> {
        self.run(
            "proposal_history",
            self.relational.proposal_history(validators),
        )
        .await
    }

    pub async fn earnings(&self, validators: &IdentifierSet) -> Result<Option<EarningsSnapshot>> {
        if validators.is_empty() {
            return Ok(None);
        }
        self.run("earnings", self.relational.earnings(validators))
            .await
    }

    pub async fn graffitiwall(&self) -> Result<Vec<GraffitiwallPixel>> {
        self.run("graffitiwall", self.relational.graffitiwall())
            .await
    }

    /// Snapshot and proposal history in parallel; the first error drops the
    /// other query.
    pub async fn snapshot_and_history(
        &self,
        validators: &IdentifierSet,
        limit: usize,
    ) -> Result<(Vec<ValidatorRecord>, Vec<ProposalHistoryRecord>)> {
        tokio::try_join!(
            self.validator_snapshot(validators, limit),
            self.proposal_history(validators),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use types::{ProposalStatus, FAR_FUTURE_EPOCH};

    fn orchestrator(store: Arc<MemoryStore>, timeout: Duration) -> QueryOrchestrator {
        QueryOrchestrator::new(store.clone(), store, timeout)
    }

    fn set(raw: &str) -> IdentifierSet {
        IdentifierSet::parse(raw, 200).unwrap()
    }

    #[tokio::test]
    async fn test_effectiveness_requires_active_validators() {
        let store = Arc::new(MemoryStore::new());
        store.insert_validator(ValidatorRecord::new(1, vec![]).with_raw_lifecycle(50, 60, 300));

        let result = orchestrator(store, Duration::from_secs(1))
            .effectiveness(&set("1"), 100)
            .await;
        assert!(matches!(result, Err(DashboardError::NoActiveValidators)));
    }

    #[tokio::test]
    async fn test_effectiveness_reads_last_completed_epoch() {
        let store = Arc::new(MemoryStore::new());
        for index in [3, 1] {
            store.insert_validator(
                ValidatorRecord::new(index, vec![])
                    .with_raw_lifecycle(0, FAR_FUTURE_EPOCH, FAR_FUTURE_EPOCH),
            );
        }
        store.insert_effectiveness(EffectivenessSample {
            validator_index: 1,
            epoch: 99,
            attestation_efficiency: 0.9,
        });
        store.insert_effectiveness(EffectivenessSample {
            validator_index: 1,
            epoch: 100,
            attestation_efficiency: 0.1,
        });

        let result = orchestrator(store, Duration::from_secs(1))
            .effectiveness(&set("1,3"), 100)
            .await
            .unwrap();
        assert_eq!(result.active, vec![3, 1]);
        assert_eq!(result.samples.len(), 1);
        assert_eq!(result.samples[0].attestation_efficiency, 0.9);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_unavailable() {
        let store = Arc::new(MemoryStore::new());
        store.set_failure(Some(StoreError::Query("boom".into())));

        let result = orchestrator(store, Duration::from_secs(1))
            .proposals(&set("1"))
            .await;
        assert!(matches!(
            result,
            Err(DashboardError::DataSourceUnavailable(StoreError::Query(_)))
        ));
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_unavailable() {
        let store = Arc::new(MemoryStore::new());
        store.set_latency(Some(Duration::from_millis(200)));

        let result = orchestrator(store, Duration::from_millis(10))
            .proposal_history(&set("1"))
            .await;
        assert!(matches!(
            result,
            Err(DashboardError::DataSourceUnavailable(StoreError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_and_history_joins_both() {
        let store = Arc::new(MemoryStore::new());
        store.insert_validator(ValidatorRecord::new(5, vec![5]));
        store.insert_block(ProposalRecord {
            proposer: 5,
            slot: 1,
            status: ProposalStatus::Executed,
        });
        store.insert_validator_stats(ProposalHistoryRecord {
            validator_index: 5,
            day: 3,
            proposed: Some(1),
            missed: None,
            orphaned: None,
        });

        let (validators, history) = orchestrator(store, Duration::from_secs(1))
            .snapshot_and_history(&set("5"), 100)
            .await
            .unwrap();
        assert_eq!(validators.len(), 1);
        assert_eq!(validators[0].executed_proposals, 1);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_and_history_fails_as_a_whole() {
        let store = Arc::new(MemoryStore::new());
        store.insert_validator(ValidatorRecord::new(5, vec![5]));
        store.fail_query("proposal_history", StoreError::Query("relation missing".into()));

        let result = orchestrator(store, Duration::from_secs(1))
            .snapshot_and_history(&set("5"), 100)
            .await;
        assert!(matches!(
            result,
            Err(DashboardError::DataSourceUnavailable(StoreError::Query(_)))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_and_history_drops_slow_query_on_failure() {
        let store = Arc::new(MemoryStore::new());
        store.delay_query("proposal_history", Duration::from_secs(30));
        store.fail_query("validator_snapshot", StoreError::Unavailable("reset".into()));

        let orchestrator = orchestrator(store, Duration::from_secs(60));
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            orchestrator.snapshot_and_history(&set("5"), 100),
        )
        .await
        .expect("failure should not wait for the slow query");
        assert!(matches!(
            result,
            Err(DashboardError::DataSourceUnavailable(StoreError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_earnings_skips_store_for_empty_set() {
        let store = Arc::new(MemoryStore::new());
        store.set_failure(Some(StoreError::Unavailable("down".into())));

        let earnings = orchestrator(store, Duration::from_secs(1))
            .earnings(&IdentifierSet::default())
            .await
            .unwrap();
        assert_eq!(earnings, None);
    }
}

//! Postgres relational store
//!
//! Runs the dashboard queries against the explorer schema (`validators`,
//! `blocks`, `validator_stats`, `validator_names`, `validator_performance`,
//! `graffitiwall`). Postgres has no unsigned 64-bit type, so the far-future
//! epoch is stored clamped to `i64::MAX`; [`db_epoch`] maps it to `None`.

use super::{RelationalStore, StoreError, StoreResult};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};
use types::{
    lifecycle_epoch, DailyIncome, EarningsSnapshot, Epoch, GraffitiwallPixel, IdentifierSet,
    ProposalHistoryRecord, ProposalRecord, ProposalStatus, ValidatorIndex, ValidatorRecord,
};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// Lifecycle epoch column -> optional epoch
pub fn db_epoch(raw: i64) -> Option<Epoch> {
    if raw < 0 || raw == i64::MAX {
        return None;
    }
    lifecycle_epoch(raw as u64)
}

fn db_u64(raw: i64) -> u64 {
    raw.max(0) as u64
}

/// Indices beyond `i64::MAX` cannot exist in the table and are skipped
fn db_indices(validators: &IdentifierSet) -> Vec<i64> {
    validators
        .iter()
        .filter_map(|&index| i64::try_from(index).ok())
        .collect()
}

/// `blocks.status` is a numeric code stored as text
fn block_status(raw: &str, slot: i64) -> ProposalStatus {
    match raw.trim().parse::<u64>() {
        Ok(code) => ProposalStatus::from_code(code),
        Err(_) => {
            debug!(slot, status = raw, "unparseable block status, reporting unknown");
            ProposalStatus::Unknown
        }
    }
}

#[derive(Debug, FromRow)]
struct IncomeRow {
    day: i64,
    income: i64,
}

#[derive(Debug, FromRow)]
struct BlockRow {
    proposer: i64,
    slot: i64,
    status: String,
}

#[derive(Debug, FromRow)]
struct ValidatorRow {
    validatorindex: i64,
    pubkey: Vec<u8>,
    withdrawableepoch: i64,
    balance: i64,
    effectivebalance: i64,
    slashed: bool,
    activationeligibilityepoch: i64,
    lastattestationslot: Option<i64>,
    activationepoch: i64,
    exitepoch: i64,
    executedproposals: i64,
    missedproposals: i64,
    performance7d: i64,
    name: String,
    state: String,
}

impl From<ValidatorRow> for ValidatorRecord {
    fn from(row: ValidatorRow) -> Self {
        Self {
            index: db_u64(row.validatorindex),
            pubkey: row.pubkey,
            balance: row.balance,
            effective_balance: row.effectivebalance,
            status: row.state,
            slashed: row.slashed,
            activation_eligibility_epoch: db_epoch(row.activationeligibilityepoch),
            activation_epoch: db_epoch(row.activationepoch),
            exit_epoch: db_epoch(row.exitepoch),
            withdrawable_epoch: db_epoch(row.withdrawableepoch),
            last_attestation_slot: row.lastattestationslot.map(db_u64),
            executed_proposals: db_u64(row.executedproposals),
            missed_proposals: db_u64(row.missedproposals),
            performance_7d: row.performance7d,
            name: row.name,
        }
    }
}

#[derive(Debug, FromRow)]
struct StatsRow {
    validatorindex: i64,
    day: i64,
    proposed_blocks: Option<i64>,
    missed_blocks: Option<i64>,
    orphaned_blocks: Option<i64>,
}

#[derive(Debug, FromRow)]
struct EarningsRow {
    tracked: i64,
    last_day: i64,
    last_week: i64,
    last_month: i64,
    balance: i64,
    total_deposits: i64,
}

#[derive(Debug, FromRow)]
struct GraffitiRow {
    x: i64,
    y: i64,
    color: String,
    slot: i64,
    validator: i64,
}

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!("Connected to relational store (max {} connections)", max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RelationalStore for PostgresStore {
    async fn income_history(&self, validators: &IdentifierSet) -> StoreResult<Vec<DailyIncome>> {
        let rows: Vec<IncomeRow> = sqlx::query_as(
            r#"
            SELECT
                day,
                COALESCE(SUM(COALESCE(end_balance, 0) - COALESCE(start_balance, 0) - COALESCE(deposits_amount, 0)), 0)::BIGINT AS income
            FROM validator_stats
            WHERE validatorindex = ANY($1)
            GROUP BY day
            ORDER BY day"#,
        )
        .bind(db_indices(validators))
        .fetch_all(&self.pool)
        .await?;

        debug!("income_history returned {} days", rows.len());
        Ok(rows
            .into_iter()
            .map(|r| DailyIncome {
                day: db_u64(r.day),
                income: r.income,
            })
            .collect())
    }

    async fn proposals(&self, validators: &IdentifierSet) -> StoreResult<Vec<ProposalRecord>> {
        let rows: Vec<BlockRow> = sqlx::query_as(
            r#"
            SELECT proposer, slot, status
            FROM blocks
            WHERE proposer = ANY($1)
            ORDER BY slot"#,
        )
        .bind(db_indices(validators))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ProposalRecord {
                proposer: db_u64(r.proposer),
                slot: db_u64(r.slot),
                status: block_status(&r.status, r.slot),
            })
            .collect())
    }

    async fn validator_snapshot(
        &self,
        validators: &IdentifierSet,
        limit: usize,
    ) -> StoreResult<Vec<ValidatorRecord>> {
        let rows: Vec<ValidatorRow> = sqlx::query_as(
            r#"
            SELECT
                validators.validatorindex,
                validators.pubkey,
                validators.withdrawableepoch,
                validators.balance,
                validators.effectivebalance,
                validators.slashed,
                validators.activationeligibilityepoch,
                validators.lastattestationslot,
                validators.activationepoch,
                validators.exitepoch,
                (SELECT COUNT(*) FROM blocks WHERE proposer = validators.validatorindex AND status = '1') AS executedproposals,
                (SELECT COUNT(*) FROM blocks WHERE proposer = validators.validatorindex AND status = '2') AS missedproposals,
                COALESCE(validator_performance.performance7d, 0) AS performance7d,
                COALESCE(validator_names.name, '') AS name,
                validators.status AS state
            FROM validators
            LEFT JOIN validator_names ON validators.pubkey = validator_names.publickey
            LEFT JOIN validator_performance ON validators.validatorindex = validator_performance.validatorindex
            WHERE validators.validatorindex = ANY($1)
            LIMIT $2"#,
        )
        .bind(db_indices(validators))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ValidatorRecord::from).collect())
    }

    async fn active_validators(
        &self,
        validators: &IdentifierSet,
        epoch: Epoch,
    ) -> StoreResult<Vec<ValidatorIndex>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT validatorindex
            FROM validators
            WHERE validatorindex = ANY($1) AND activationepoch < $2 AND exitepoch > $2"#,
        )
        .bind(db_indices(validators))
        .bind(i64::try_from(epoch).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(index,)| db_u64(index)).collect())
    }

    async fn proposal_history(
        &self,
        validators: &IdentifierSet,
    ) -> StoreResult<Vec<ProposalHistoryRecord>> {
        let rows: Vec<StatsRow> = sqlx::query_as(
            r#"
            SELECT validatorindex, day, proposed_blocks, missed_blocks, orphaned_blocks
            FROM validator_stats
            WHERE validatorindex = ANY($1)
                AND (proposed_blocks IS NOT NULL OR missed_blocks IS NOT NULL OR orphaned_blocks IS NOT NULL)
            ORDER BY day DESC"#,
        )
        .bind(db_indices(validators))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ProposalHistoryRecord {
                validator_index: db_u64(r.validatorindex),
                day: db_u64(r.day),
                proposed: r.proposed_blocks.map(db_u64),
                missed: r.missed_blocks.map(db_u64),
                orphaned: r.orphaned_blocks.map(db_u64),
            })
            .collect())
    }

    async fn earnings(&self, validators: &IdentifierSet) -> StoreResult<Option<EarningsSnapshot>> {
        let row: EarningsRow = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM validator_performance WHERE validatorindex = ANY($1)) AS tracked,
                (SELECT COALESCE(SUM(performance1d), 0)::BIGINT FROM validator_performance WHERE validatorindex = ANY($1)) AS last_day,
                (SELECT COALESCE(SUM(performance7d), 0)::BIGINT FROM validator_performance WHERE validatorindex = ANY($1)) AS last_week,
                (SELECT COALESCE(SUM(performance31d), 0)::BIGINT FROM validator_performance WHERE validatorindex = ANY($1)) AS last_month,
                (SELECT COALESCE(SUM(balance), 0)::BIGINT FROM validators WHERE validatorindex = ANY($1)) AS balance,
                (SELECT COALESCE(SUM(deposits_amount), 0)::BIGINT FROM validator_stats WHERE validatorindex = ANY($1)) AS total_deposits"#,
        )
        .bind(db_indices(validators))
        .fetch_one(&self.pool)
        .await?;

        if row.tracked == 0 {
            return Ok(None);
        }

        Ok(Some(EarningsSnapshot {
            last_day: row.last_day,
            last_week: row.last_week,
            last_month: row.last_month,
            total: row.balance - row.total_deposits,
            total_deposits: row.total_deposits,
        }))
    }

    async fn graffitiwall(&self) -> StoreResult<Vec<GraffitiwallPixel>> {
        let rows: Vec<GraffitiRow> =
            sqlx::query_as("SELECT x, y, color, slot, validator FROM graffitiwall")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|r| GraffitiwallPixel {
                x: db_u64(r.x),
                y: db_u64(r.y),
                color: r.color,
                slot: db_u64(r.slot),
                validator: db_u64(r.validator),
            })
            .collect())
    }

    async fn latest_epoch(&self) -> StoreResult<Option<Epoch>> {
        let (epoch,): (Option<i64>,) = sqlx::query_as("SELECT MAX(epoch) FROM epochs")
            .fetch_one(&self.pool)
            .await?;

        Ok(epoch.map(db_u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_epoch_sentinels() {
        assert_eq!(db_epoch(i64::MAX), None);
        assert_eq!(db_epoch(-1), None);
        assert_eq!(db_epoch(0), Some(0));
        assert_eq!(db_epoch(194_048), Some(194_048));
    }

    #[test]
    fn test_block_status_codes() {
        assert_eq!(block_status("1", 10), ProposalStatus::Executed);
        assert_eq!(block_status(" 3 ", 10), ProposalStatus::Orphaned);
        assert_eq!(block_status("7", 10), ProposalStatus::Unknown);
        assert_eq!(block_status("garbage", 10), ProposalStatus::Unknown);
        assert_eq!(block_status("", 10), ProposalStatus::Unknown);
    }

    #[test]
    fn test_db_indices_skip_unrepresentable() {
        let set = IdentifierSet::parse("1,18446744073709551615,3", 10).unwrap();
        assert_eq!(db_indices(&set), vec![1, 3]);
    }

    #[test]
    fn test_validator_row_conversion() {
        let row = ValidatorRow {
            validatorindex: 42,
            pubkey: vec![0xaa, 0xbb],
            withdrawableepoch: i64::MAX,
            balance: 32_000_000_000,
            effectivebalance: 32_000_000_000,
            slashed: false,
            activationeligibilityepoch: 0,
            lastattestationslot: None,
            activationepoch: 0,
            exitepoch: i64::MAX,
            executedproposals: 3,
            missedproposals: 1,
            performance7d: 12_000_000,
            name: String::new(),
            state: "active_online".to_string(),
        };

        let record = ValidatorRecord::from(row);
        assert_eq!(record.index, 42);
        assert_eq!(record.activation_epoch, Some(0));
        assert_eq!(record.exit_epoch, None);
        assert_eq!(record.withdrawable_epoch, None);
        assert_eq!(record.last_attestation_slot, None);
        assert_eq!(record.executed_proposals, 3);
    }

    #[test]
    fn test_sqlx_error_classification() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Query(_)
        ));
    }
}

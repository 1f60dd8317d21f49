//! Response shaping
//!
//! Turns store records into the compact array/object payloads the dashboard
//! client reads directly. All time bases are mapped to Unix seconds through
//! one [`ChainClock`]. All monetary values go through one
//! [`DisplayCurrency`] per response.

use crate::orchestrator::EffectivenessResult;
use serde::Serialize;
use types::{
    format_amount, format_income, to_display, ChainClock, Currency, DailyIncome,
    EarningsSnapshot, Epoch, ProposalHistoryRecord, ProposalRecord, Slot, UnixSeconds,
    ValidatorIndex, ValidatorRecord,
};

const INCOME_POSITIVE_COLOR: &str = "#7cb5ec";
const INCOME_NEGATIVE_COLOR: &str = "#f7a35c";

const BALANCE_DECIMALS: usize = 4;
const EFFECTIVE_BALANCE_DECIMALS: usize = 1;

/// Currency and the rate captured for it at the start of a request
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayCurrency {
    pub currency: Currency,
    pub rate: f64,
}

impl DisplayCurrency {
    pub fn new(currency: Currency, rate: f64) -> Self {
        Self { currency, rate }
    }

    pub fn native() -> Self {
        Self::new(Currency::native(), 1.0)
    }

    pub fn convert(&self, amount_base: i64) -> f64 {
        to_display(amount_base, self.rate)
    }

    pub fn format(&self, amount_base: i64, decimals: usize) -> String {
        format_amount(self.convert(amount_base), decimals, &self.currency)
    }

    pub fn format_income(&self, amount_base: i64) -> String {
        format_income(amount_base, &self.currency, self.rate)
    }
}

/// Income chart point; `x` is Unix milliseconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: f64,
    pub y: f64,
    pub color: &'static str,
}

/// `[unix_seconds, status]`
pub type ProposalPoint = (UnixSeconds, u8);

/// `[identifier, unix_seconds, proposed, missed, orphaned]`
pub type ProposalHistoryRow = (ValidatorIndex, UnixSeconds, u64, u64, u64);

/// `[index, unix_seconds]` for an epoch or slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimedIndex(pub u64, pub UnixSeconds);

/// One validators-table row, serialized as a JSON array:
/// `[pubkey, index, [balance, effective], state, activation, exit,
/// withdrawable, last_attestation, [executed, missed], earnings]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatorRow(
    pub String,
    pub String,
    pub (String, String),
    pub String,
    pub Option<TimedIndex>,
    pub Option<TimedIndex>,
    pub Option<TimedIndex>,
    pub Option<TimedIndex>,
    pub (u64, u64),
    pub String,
);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorsTable {
    pub latest_epoch: Epoch,
    pub data: Vec<ValidatorRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorEarnings {
    pub last_day: f64,
    pub last_week: f64,
    pub last_month: f64,
    pub total: f64,
    pub total_deposits: f64,
    pub apr: f64,
    pub last_day_formatted: String,
    pub last_week_formatted: String,
    pub last_month_formatted: String,
    pub total_formatted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub latest_epoch: Epoch,
    pub validators: Vec<ValidatorRow>,
    pub proposal_history: Vec<ProposalHistoryRow>,
}

#[derive(Debug, Clone, Copy)]
pub struct ResponseShaper {
    clock: ChainClock,
}

impl ResponseShaper {
    pub fn new(clock: ChainClock) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &ChainClock {
        &self.clock
    }

    pub fn income_chart(&self, history: &[DailyIncome], display: &DisplayCurrency) -> Vec<ChartPoint> {
        history
            .iter()
            .map(|d| ChartPoint {
                x: (self.clock.day_to_time(d.day) as f64) * 1000.0,
                y: display.convert(d.income),
                color: if d.income < 0 {
                    INCOME_NEGATIVE_COLOR
                } else {
                    INCOME_POSITIVE_COLOR
                },
            })
            .collect()
    }

    pub fn proposals(&self, proposals: &[ProposalRecord]) -> Vec<ProposalPoint> {
        proposals
            .iter()
            .map(|p| (self.clock.slot_to_time(p.slot), p.status.code()))
            .collect()
    }

    pub fn validators_table(
        &self,
        records: &[ValidatorRecord],
        latest_epoch: Epoch,
        display: &DisplayCurrency,
    ) -> ValidatorsTable {
        ValidatorsTable {
            latest_epoch,
            data: self.validator_rows(records, display),
        }
    }

    fn validator_rows(&self, records: &[ValidatorRecord], display: &DisplayCurrency) -> Vec<ValidatorRow> {
        records
            .iter()
            .map(|v| {
                ValidatorRow(
                    v.pubkey_hex(),
                    v.index.to_string(),
                    (
                        display.format(v.balance, BALANCE_DECIMALS),
                        display.format(v.effective_balance, EFFECTIVE_BALANCE_DECIMALS),
                    ),
                    v.status.clone(),
                    self.epoch_point(v.activation_epoch),
                    self.epoch_point(v.exit_epoch),
                    self.epoch_point(v.withdrawable_epoch),
                    self.slot_point(v.last_attestation_slot),
                    (v.executed_proposals, v.missed_proposals),
                    display.format_income(v.performance_7d),
                )
            })
            .collect()
    }

    fn epoch_point(&self, epoch: Option<Epoch>) -> Option<TimedIndex> {
        epoch.map(|e| TimedIndex(e, self.clock.epoch_to_time(e)))
    }

    fn slot_point(&self, slot: Option<Slot>) -> Option<TimedIndex> {
        slot.map(|s| TimedIndex(s, self.clock.slot_to_time(s)))
    }

    pub fn earnings(
        &self,
        snapshot: Option<EarningsSnapshot>,
        display: &DisplayCurrency,
    ) -> ValidatorEarnings {
        let Some(e) = snapshot else {
            return ValidatorEarnings::default();
        };

        let apr = if e.total_deposits > 0 {
            (e.last_week as f64 / 7.0 * 365.0) / e.total_deposits as f64
        } else {
            0.0
        };

        ValidatorEarnings {
            last_day: display.convert(e.last_day),
            last_week: display.convert(e.last_week),
            last_month: display.convert(e.last_month),
            total: display.convert(e.total),
            total_deposits: display.convert(e.total_deposits),
            apr,
            last_day_formatted: display.format_income(e.last_day),
            last_week_formatted: display.format_income(e.last_week),
            last_month_formatted: display.format_income(e.last_month),
            total_formatted: display.format_income(e.total),
        }
    }

    /// One value per active validator with a sample, in active-subset order
    pub fn effectiveness(&self, result: &EffectivenessResult) -> Vec<f64> {
        result
            .active
            .iter()
            .filter_map(|index| {
                result
                    .samples
                    .iter()
                    .find(|s| s.validator_index == *index)
                    .map(|s| s.attestation_efficiency)
            })
            .collect()
    }

    pub fn proposal_history(&self, rows: &[ProposalHistoryRecord]) -> Vec<ProposalHistoryRow> {
        rows.iter()
            .map(|r| {
                (
                    r.validator_index,
                    self.clock.day_to_time(r.day),
                    r.proposed.unwrap_or(0),
                    r.missed.unwrap_or(0),
                    r.orphaned.unwrap_or(0),
                )
            })
            .collect()
    }

    pub fn summary(
        &self,
        records: &[ValidatorRecord],
        history: &[ProposalHistoryRecord],
        latest_epoch: Epoch,
        display: &DisplayCurrency,
    ) -> DashboardSummary {
        DashboardSummary {
            latest_epoch,
            validators: self.validator_rows(records, display),
            proposal_history: self.proposal_history(history),
        }
    }
}

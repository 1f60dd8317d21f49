//! Read projections produced by the stores
//!
//! Each record is built fresh per request and never mutated afterwards.
//! Monetary fields are base units; epoch fields that may be unset are already
//! `Option`s (see [`lifecycle_epoch`]).

use crate::identifiers::ValidatorIndex;
use crate::time::{lifecycle_epoch, Day, Epoch, Slot};
use serde::{Deserialize, Serialize};

/// Canonical validator state joined with name and rolling performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    pub index: ValidatorIndex,
    pub pubkey: Vec<u8>,
    pub balance: i64,
    pub effective_balance: i64,
    pub status: String,
    pub slashed: bool,
    pub activation_eligibility_epoch: Option<Epoch>,
    pub activation_epoch: Option<Epoch>,
    pub exit_epoch: Option<Epoch>,
    pub withdrawable_epoch: Option<Epoch>,
    pub last_attestation_slot: Option<Slot>,
    pub executed_proposals: u64,
    pub missed_proposals: u64,
    /// Income over the last seven days, base units
    pub performance_7d: i64,
    /// Empty when the validator has no registered name
    pub name: String,
}

impl ValidatorRecord {
    /// Fresh record with every optional field unset
    pub fn new(index: ValidatorIndex, pubkey: Vec<u8>) -> Self {
        Self {
            index,
            pubkey,
            balance: 0,
            effective_balance: 0,
            status: String::new(),
            slashed: false,
            activation_eligibility_epoch: None,
            activation_epoch: None,
            exit_epoch: None,
            withdrawable_epoch: None,
            last_attestation_slot: None,
            executed_proposals: 0,
            missed_proposals: 0,
            performance_7d: 0,
            name: String::new(),
        }
    }

    /// Apply raw stored lifecycle epochs, translating the far-future sentinel
    pub fn with_raw_lifecycle(mut self, activation: u64, exit: u64, withdrawable: u64) -> Self {
        self.activation_epoch = lifecycle_epoch(activation);
        self.exit_epoch = lifecycle_epoch(exit);
        self.withdrawable_epoch = lifecycle_epoch(withdrawable);
        self
    }

    /// Activated before `epoch` and not yet exited at `epoch`
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        let activated = self.activation_epoch.is_some_and(|a| a < epoch);
        let not_exited = self.exit_epoch.map_or(true, |e| e > epoch);
        activated && not_exited
    }

    pub fn pubkey_hex(&self) -> String {
        hex::encode(&self.pubkey)
    }
}

/// Outcome of a block proposal slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProposalStatus {
    Unknown = 0,
    Executed = 1,
    Missed = 2,
    Orphaned = 3,
}

impl ProposalStatus {
    /// Store status code; anything unrecognized is `Unknown`
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => Self::Executed,
            2 => Self::Missed,
            3 => Self::Orphaned,
            _ => Self::Unknown,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub proposer: ValidatorIndex,
    pub slot: Slot,
    pub status: ProposalStatus,
}

/// Daily proposal rollup; `None` counts mean the column was null
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalHistoryRecord {
    pub validator_index: ValidatorIndex,
    pub day: Day,
    pub proposed: Option<u64>,
    pub missed: Option<u64>,
    pub orphaned: Option<u64>,
}

impl ProposalHistoryRecord {
    pub fn has_counts(&self) -> bool {
        self.proposed.is_some() || self.missed.is_some() || self.orphaned.is_some()
    }
}

/// Attestation efficiency of one validator for one epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectivenessSample {
    pub validator_index: ValidatorIndex,
    pub epoch: Epoch,
    pub attestation_efficiency: f64,
}

/// Aggregate income of a validator set, base units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsSnapshot {
    pub last_day: i64,
    pub last_week: i64,
    pub last_month: i64,
    pub total: i64,
    pub total_deposits: i64,
}

/// Summed income of a validator set for one day, base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyIncome {
    pub day: Day,
    pub income: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraffitiwallPixel {
    pub x: u64,
    pub y: u64,
    pub color: String,
    pub slot: Slot,
    pub validator: ValidatorIndex,
}

//! # Validator Dashboard Types
//!
//! Pure domain types shared by the dashboard service and its store adapters.
//! Nothing in this crate performs I/O.
//!
//! ## Contents
//!
//! - **Identifiers**: bounded, de-duplicated validator index sets parsed from
//!   caller input ([`IdentifierSet`])
//! - **Chain time**: slot/epoch/day to Unix time conversion ([`ChainClock`])
//! - **Currency**: base-unit to display-currency conversion and formatting
//! - **Records**: read projections returned by the stores
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{ChainClock, IdentifierSet};
//!
//! let set = IdentifierSet::parse("5,12,5", 200).unwrap();
//! assert_eq!(set.as_slice(), &[5, 12]);
//!
//! let clock = ChainClock::mainnet();
//! assert_eq!(clock.epoch_to_time(1), clock.slot_to_time(32));
//! ```

pub mod common;
pub mod currency;
pub mod identifiers;
pub mod records;
pub mod time;

pub use common::errors::IdentifierError;
pub use currency::{
    format_amount, format_income, to_display, Currency, BASE_UNITS_PER_COIN, NATIVE_CURRENCY,
};
pub use identifiers::{IdentifierSet, ValidatorIndex};
pub use records::{
    DailyIncome, EarningsSnapshot, EffectivenessSample, GraffitiwallPixel, ProposalHistoryRecord,
    ProposalRecord, ProposalStatus, ValidatorRecord,
};
pub use time::{lifecycle_epoch, ChainClock, Day, Epoch, Slot, UnixSeconds, FAR_FUTURE_EPOCH};

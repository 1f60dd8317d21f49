//! Chain time base conversion
//!
//! Slots, epochs and daily rollups all map linearly onto Unix time from one
//! genesis timestamp. Keeping the three conversions on a single [`ChainClock`]
//! guarantees that `epoch_to_time(e) == slot_to_time(e * slots_per_epoch)`.

use serde::{Deserialize, Serialize};

pub type Slot = u64;
pub type Epoch = u64;
pub type Day = u64;
pub type UnixSeconds = u64;

/// Reserved epoch value meaning "not yet occurred / not applicable"
pub const FAR_FUTURE_EPOCH: Epoch = u64::MAX;

/// Convert a stored lifecycle epoch into an explicit optional.
///
/// Store adapters call this once per field, right after reading a row, so
/// nothing downstream ever compares against [`FAR_FUTURE_EPOCH`].
pub fn lifecycle_epoch(raw: u64) -> Option<Epoch> {
    if raw == FAR_FUTURE_EPOCH {
        None
    } else {
        Some(raw)
    }
}

/// Fixed genesis and interval parameters of a beacon chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainClock {
    pub genesis_timestamp: UnixSeconds,
    pub seconds_per_slot: u64,
    pub slots_per_epoch: u64,
    pub seconds_per_day: u64,
}

impl ChainClock {
    pub const fn new(
        genesis_timestamp: UnixSeconds,
        seconds_per_slot: u64,
        slots_per_epoch: u64,
        seconds_per_day: u64,
    ) -> Self {
        Self {
            genesis_timestamp,
            seconds_per_slot,
            slots_per_epoch,
            seconds_per_day,
        }
    }

    /// Ethereum mainnet beacon chain parameters
    pub const fn mainnet() -> Self {
        Self::new(1_606_824_023, 12, 32, 86_400)
    }

    pub fn seconds_per_epoch(&self) -> u64 {
        self.seconds_per_slot.saturating_mul(self.slots_per_epoch)
    }

    pub fn slot_to_time(&self, slot: Slot) -> UnixSeconds {
        self.offset(slot, self.seconds_per_slot)
    }

    pub fn epoch_to_time(&self, epoch: Epoch) -> UnixSeconds {
        self.offset(epoch, self.seconds_per_epoch())
    }

    pub fn day_to_time(&self, day: Day) -> UnixSeconds {
        self.offset(day, self.seconds_per_day)
    }

    /// Epoch in progress at `now`; zero before genesis
    pub fn epoch_at(&self, now: UnixSeconds) -> Epoch {
        let per_epoch = self.seconds_per_epoch();
        if per_epoch == 0 {
            return 0;
        }
        now.saturating_sub(self.genesis_timestamp) / per_epoch
    }

    // Saturates instead of wrapping so the mapping stays total and monotonic.
    fn offset(&self, index: u64, interval: u64) -> UnixSeconds {
        self.genesis_timestamp
            .saturating_add(index.saturating_mul(interval))
    }
}

impl Default for ChainClock {
    fn default() -> Self {
        Self::mainnet()
    }
}

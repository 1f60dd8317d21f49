//! Default configuration values
//!
//! Used when neither the config file nor the environment sets a value.

/// HTTP server defaults
pub mod server {
    pub const BIND_ADDRESS: &str = "127.0.0.1";
    pub const PORT: u16 = 8080;
}

/// Per-tier validator limits
pub mod limits {
    /// Limit for anonymous callers and unknown tiers
    pub const DEFAULT_MAX_VALIDATORS: usize = 100;

    /// Named tiers and their limits
    pub const TIERS: &[(&str, usize)] = &[
        ("standard", 100),
        ("plankton", 120),
        ("goldfish", 150),
        ("whale", 200),
        ("guppy", 220),
        ("dolphin", 250),
        ("orca", 280),
    ];
}

/// Display currency defaults
pub mod currency {
    pub const DEFAULT_CURRENCY: &str = types::NATIVE_CURRENCY;
}

/// Storage defaults
pub mod storage {
    pub const MAX_CONNECTIONS: u32 = 10;

    /// Per-query deadline (milliseconds)
    pub const QUERY_TIMEOUT_MS: u64 = 10_000;

    /// Latest-epoch poll interval (milliseconds), one mainnet slot
    pub const LATEST_EPOCH_REFRESH_MS: u64 = 12_000;
}

//! Ledger Constants
//!
//! All magic numbers and default configuration values for the Tally ledger
//! core. Engine configs take their `Default` values from here; integrators
//! override them per instance.

/// Reference token scale used by tests and defaults
pub mod token {
    /// One whole unit in base units (1.0 = 100_000_000)
    pub const ONE: u64 = 100_000_000;
}

/// Basis points
pub mod bps {
    /// Basis points denominator (10_000 = 100%)
    pub const DENOMINATOR: u64 = 10_000;

    /// Upper bound accepted for any ratio expressed in basis points
    pub const MAX: u64 = DENOMINATOR;
}

/// Time-related constants
pub mod time {
    /// Seconds in a (365 day) year, used for linear interest accrual
    pub const SECONDS_PER_YEAR: u64 = 31_536_000;
}

/// Precision constants
pub mod precision {
    /// Fixed-point scale for the health factor (1e18 = parity)
    pub const WAD: u128 = 1_000_000_000_000_000_000;

    /// Health factor reported for a position without debt
    pub const HEALTH_FACTOR_INFINITE: u128 = u128::MAX;
}

/// Credit engine defaults
pub mod credit {
    /// Default liquidation threshold (80%)
    pub const DEFAULT_LIQUIDATION_THRESHOLD_BPS: u64 = 8_000;

    /// Default liquidation bonus paid to liquidators (5%)
    pub const DEFAULT_LIQUIDATION_BONUS_BPS: u64 = 500;

    /// Default annual borrow rate (5% APR)
    pub const DEFAULT_RATE_BPS: u64 = 500;

    /// Maximum annual borrow rate accepted by config validation (1000% APR)
    pub const MAX_RATE_BPS: u64 = 100_000;

    /// Maximum liquidation bonus accepted by config validation (50%)
    pub const MAX_LIQUIDATION_BONUS_BPS: u64 = 5_000;
}

/// Debt ceiling normalization defaults
pub mod ceiling {
    /// Default normalization divisor: a 6-decimal asset recorded at
    /// 2-decimal precision
    pub const DEFAULT_NORMALIZATION_DIVISOR: u64 = 10_000;
}

/// Price feed defaults
pub mod oracle {
    /// Maximum age of a reading before it is considered stale (1 hour)
    pub const MAX_PRICE_AGE_SECS: u64 = 3_600;
}

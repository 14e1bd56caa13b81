//! Error Types for the Tally ledger core
//!
//! Every engine operation returns a `LedgerResult`. A failure aborts the whole
//! operation; there is no error variant that means "succeeded with zero".

use thiserror::Error;

use crate::types::Address;

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Main error enum for all ledger errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ============ Share Vault Errors ============
    /// A deposit or mint would credit the receiver with no shares
    #[error("deposit of {assets} assets would mint zero shares")]
    ZeroShares { assets: u64 },

    /// Caller may not act on behalf of the stated owner
    #[error("caller {caller:?} is not authorized to act for {owner:?}")]
    NotAuthorized { owner: Address, caller: Address },

    // ============ Credit Errors ============
    /// Borrow above the threshold, or liquidation seizing more than is held
    #[error("insufficient collateral: needed {needed}, available {available}")]
    InsufficientCollateral { needed: u64, available: u64 },

    /// Liquidation attempted on a position at or above parity
    #[error("position is healthy (health factor {health_factor})")]
    PositionHealthy { health_factor: u128 },

    /// A ceilinged quantity would exceed its configured limit
    #[error("capacity exceeded ({reason:?}): requested {requested}, limit {limit}")]
    CapacityExceeded {
        requested: u64,
        limit: u64,
        reason: CapacityReason,
    },

    // ============ Transfer Errors ============
    /// Strict transfer mode observed a different amount than requested
    #[error("transfer mismatch: requested {requested}, observed {observed}")]
    TransferMismatch { requested: u64, observed: u64 },

    /// Holder balance too small for the operation
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: u64, requested: u64 },

    // ============ Amount Errors ============
    /// Zero amount not allowed
    #[error("zero amount not allowed")]
    ZeroAmount,

    /// Amount exceeds maximum allowed
    #[error("amount {amount} exceeds maximum {maximum}")]
    ExceedsMaximum { amount: u64, maximum: u64 },

    // ============ Price Errors ============
    /// A risk-increasing operation was refused on an unusable price
    #[error("price {value} (age {age}s) is out of range or stale")]
    UnsafePrice { value: u64, age: u64 },

    // ============ State Errors ============
    /// No record stored for the account
    #[error("account {account:?} not found")]
    AccountNotFound { account: Address },

    /// Recorded share supply does not equal the sum of balances
    #[error("share conservation violated: recorded {recorded}, summed {summed}")]
    ConservationViolated { recorded: u64, summed: u64 },

    /// Outstanding claims exceed the assets backing them
    #[error("solvency violated: claims {claims} exceed assets {total_assets}")]
    SolvencyViolated { claims: u64, total_assets: u64 },

    /// Recorded debt-ceiling usage does not match the accounts holding it
    #[error("ceiling usage drifted: recorded {recorded}, derived {derived}")]
    CeilingDrift { recorded: u64, derived: u64 },

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    #[error("arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow occurred
    #[error("arithmetic underflow")]
    Underflow,

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    // ============ Configuration Errors ============
    /// Invalid configuration or input parameter
    #[error("invalid parameter `{param}`: {reason}")]
    InvalidParameter {
        param: &'static str,
        reason: &'static str,
    },
}

/// Which limit a `CapacityExceeded` error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityReason {
    /// Share vault `max_total_assets`
    DepositCap,
    /// Credit engine collateral supply cap
    SupplyCap,
    /// Normalized debt would exceed the debt ceiling
    DebtCeiling,
    /// Non-zero borrow that normalizes to a zero debt increment
    DustBelowNormalization,
}

impl LedgerError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroShares { .. } => "E001_ZERO_SHARES",
            Self::NotAuthorized { .. } => "E002_NOT_AUTHORIZED",
            Self::InsufficientCollateral { .. } => "E010_INSUFFICIENT_COLL",
            Self::PositionHealthy { .. } => "E011_POSITION_HEALTHY",
            Self::CapacityExceeded { .. } => "E012_CAPACITY_EXCEEDED",
            Self::TransferMismatch { .. } => "E020_TRANSFER_MISMATCH",
            Self::InsufficientBalance { .. } => "E021_INSUFFICIENT_BALANCE",
            Self::ZeroAmount => "E030_ZERO_AMOUNT",
            Self::ExceedsMaximum { .. } => "E031_EXCEEDS_MAXIMUM",
            Self::UnsafePrice { .. } => "E035_UNSAFE_PRICE",
            Self::AccountNotFound { .. } => "E040_ACCOUNT_NOT_FOUND",
            Self::ConservationViolated { .. } => "E041_CONSERVATION",
            Self::SolvencyViolated { .. } => "E042_SOLVENCY",
            Self::CeilingDrift { .. } => "E043_CEILING_DRIFT",
            Self::Overflow => "E080_OVERFLOW",
            Self::Underflow => "E081_UNDERFLOW",
            Self::DivisionByZero => "E082_DIV_ZERO",
            Self::InvalidParameter { .. } => "E090_INVALID_PARAM",
        }
    }

    /// Returns true if the caller can fix the input and retry
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ZeroShares { .. } => true,             // Deposit more
            Self::InsufficientCollateral { .. } => true, // Add collateral or repay
            Self::PositionHealthy { .. } => true,        // Wait for price move
            Self::CapacityExceeded { .. } => true,       // Smaller amount
            Self::InsufficientBalance { .. } => true,    // Get more funds
            Self::UnsafePrice { .. } => true,            // Wait for a fresh price
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_error_codes_unique() {
        let errors = [
            LedgerError::ZeroShares { assets: 1 },
            LedgerError::NotAuthorized { owner: [1u8; 32], caller: [2u8; 32] },
            LedgerError::InsufficientCollateral { needed: 81, available: 80 },
            LedgerError::PositionHealthy { health_factor: 1 },
            LedgerError::CapacityExceeded {
                requested: 1,
                limit: 0,
                reason: CapacityReason::DebtCeiling,
            },
            LedgerError::TransferMismatch { requested: 100, observed: 98 },
            LedgerError::ZeroAmount,
            LedgerError::UnsafePrice { value: 0, age: 0 },
            LedgerError::ConservationViolated { recorded: 1, summed: 2 },
            LedgerError::CeilingDrift { recorded: 1, derived: 2 },
            LedgerError::Overflow,
            LedgerError::Underflow,
            LedgerError::DivisionByZero,
        ];

        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        let unique: BTreeSet<_> = codes.iter().collect();
        assert_eq!(codes.len(), unique.len(), "Error codes must be unique");
    }

    #[test]
    fn test_display_carries_quantities() {
        let err = LedgerError::TransferMismatch { requested: 100, observed: 98 };
        assert_eq!(err.to_string(), "transfer mismatch: requested 100, observed 98");
    }

    #[test]
    fn test_recoverable() {
        assert!(LedgerError::ZeroShares { assets: 1 }.is_recoverable());
        assert!(!LedgerError::Overflow.is_recoverable());
    }
}

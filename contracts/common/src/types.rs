//! Core Types for the Tally ledger core
//!
//! Plain data records shared by the share vault and the credit engine.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Type alias for account identifiers (32-byte key)
pub type Address = [u8; 32];

/// Caller-supplied time in seconds
pub type Timestamp = u64;

// ============ Share Vault Types ============

/// Aggregate state of a share pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Pool {
    /// Underlying units the pool accounts for
    pub total_assets: u64,
    /// Sum of all holder share balances
    pub total_shares: u64,
}

impl Pool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// True before the first deposit (or after every share was redeemed)
    pub fn is_bootstrap(&self) -> bool {
        self.total_shares == 0
    }
}

/// A holder's claim on a share pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ShareAccount {
    /// Share balance
    pub shares: u64,
}

// ============ Credit Types ============

/// Lifecycle of a credit account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum CreditStatus {
    /// No collateral and no debt
    Empty,
    /// Holds collateral, debt, or both
    Active,
}

/// Per-borrower collateral and debt record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CreditAccount {
    /// Collateral in base units
    pub collateral: u64,
    /// Interest-inclusive debt as of `last_accrual`
    pub debt: u64,
    /// Time interest was last folded into `debt`
    pub last_accrual: Timestamp,
    /// Borrowed principal still outstanding, never above `debt`
    pub principal: u64,
    /// Normalized debt-ceiling units held by this account
    pub ceiling_units: u64,
}

impl CreditAccount {
    /// Creates an empty account whose accrual clock starts at `now`
    pub fn new(now: Timestamp) -> Self {
        Self {
            collateral: 0,
            debt: 0,
            last_accrual: now,
            principal: 0,
            ceiling_units: 0,
        }
    }

    pub fn status(&self) -> CreditStatus {
        if self.collateral == 0 && self.debt == 0 {
            CreditStatus::Empty
        } else {
            CreditStatus::Active
        }
    }

    pub fn has_debt(&self) -> bool {
        self.debt > 0
    }
}

// ============ Operation Types ============

/// Operations an integrator can route through the engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum OperationKind {
    Deposit,
    Redeem,
    Borrow,
    Repay,
    Liquidate,
    WithdrawCollateral,
}

impl OperationKind {
    /// True for operations that can make a position riskier
    pub fn increases_risk(&self) -> bool {
        matches!(self, Self::Borrow | Self::WithdrawCollateral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_account_status() {
        let mut account = CreditAccount::new(10);
        assert_eq!(account.status(), CreditStatus::Empty);

        account.collateral = 5;
        assert_eq!(account.status(), CreditStatus::Active);

        account.collateral = 0;
        account.debt = 1;
        assert_eq!(account.status(), CreditStatus::Active);
        assert!(account.has_debt());
    }

    #[test]
    fn test_risk_increasing_operations() {
        assert!(OperationKind::Borrow.increases_risk());
        assert!(OperationKind::WithdrawCollateral.increases_risk());
        assert!(!OperationKind::Repay.increases_risk());
        assert!(!OperationKind::Liquidate.increases_risk());
        assert!(!OperationKind::Deposit.increases_risk());
    }

    #[test]
    fn test_pool_bootstrap() {
        let pool = Pool::new();
        assert!(pool.is_bootstrap());
        let pool = Pool { total_assets: 0, total_shares: 1 };
        assert!(!pool.is_bootstrap());
    }
}

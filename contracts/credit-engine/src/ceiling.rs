//! Debt Ceiling
//!
//! Caps the engine's aggregate borrowed principal, measured in normalized
//! units of `divisor` base units each. The ceiling check and the recorded
//! increment always use the same normalized value, so a borrow can never
//! pass the check with one precision and be recorded with another.
//!
//! Borrows smaller than one normalized unit ("dust") are handled by the
//! configured `DustPolicy`; none of them lets a non-zero borrow slip past
//! the ceiling unrecorded.
//!
//! Under `Reject` and `RoundUp` every account holds the whole units it was
//! charged (`CreditAccount::ceiling_units`) and gives back only those. Under
//! `CarryRemainder` usage is derived from the aggregate principal alone.
//! Accrued interest is never charged against the ceiling.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use tally_common::{
    constants::ceiling::DEFAULT_NORMALIZATION_DIVISOR,
    errors::{CapacityReason, LedgerError, LedgerResult},
    math::{div_up, mul_div_up, safe_add, safe_sub, to_u64},
    types::CreditAccount,
};

/// Treatment of borrows below one normalized unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum DustPolicy {
    /// Fail any borrow below one unit; charge `ceil(amount / divisor)` otherwise
    #[default]
    Reject,
    /// Charge `ceil(amount / divisor)` units against the ceiling
    RoundUp,
    /// Track raw principal exactly and carry the sub-unit remainder
    CarryRemainder,
}

impl DustPolicy {
    /// True when accounts hold their own whole-unit charge
    pub fn charges_accounts(&self) -> bool {
        matches!(self, Self::Reject | Self::RoundUp)
    }
}

/// Debt ceiling configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DebtCeilingConfig {
    /// Maximum aggregate debt, in normalized units
    pub ceiling: u64,
    /// Base units per normalized unit
    pub divisor: u64,
    pub dust_policy: DustPolicy,
}

impl DebtCeilingConfig {
    pub fn new(ceiling: u64) -> Self {
        Self {
            ceiling,
            divisor: DEFAULT_NORMALIZATION_DIVISOR,
            dust_policy: DustPolicy::default(),
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.divisor == 0 {
            return Err(LedgerError::InvalidParameter {
                param: "divisor",
                reason: "normalization divisor cannot be zero",
            });
        }
        Ok(())
    }

    /// Units an account must hold at least, given its principal
    pub fn minimum_units(&self, principal: u64) -> LedgerResult<u64> {
        if self.dust_policy.charges_accounts() {
            div_up(principal, self.divisor)
        } else {
            Ok(0)
        }
    }
}

/// Ceiling consumption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CeilingUsage {
    /// Units charged against the ceiling
    pub normalized: u64,
    /// Outstanding principal in base units
    pub raw: u64,
}

impl CeilingUsage {
    /// Usage held by `accounts`, e.g. when reloading a store
    pub fn from_accounts<'a, I>(config: &DebtCeilingConfig, accounts: I) -> LedgerResult<Self>
    where
        I: IntoIterator<Item = &'a CreditAccount>,
    {
        let mut raw: u128 = 0;
        let mut units: u128 = 0;
        for account in accounts {
            raw += account.principal as u128;
            units += account.ceiling_units as u128;
        }
        let raw = to_u64(raw)?;
        let normalized = if config.dust_policy.charges_accounts() {
            to_u64(units)?
        } else {
            raw / config.divisor
        };
        Ok(Self { normalized, raw })
    }

    /// Charge a borrow of `amount`
    ///
    /// Returns the updated usage and the normalized increment recorded.
    /// Under `Reject` and `RoundUp` the increment is what the borrowing
    /// account now additionally holds.
    ///
    /// # Errors
    /// - `CapacityExceeded(DustBelowNormalization)` under `Reject` when the
    ///   amount is below one unit
    /// - `CapacityExceeded(DebtCeiling)` when the ceiling would be exceeded
    pub fn reserve(&self, config: &DebtCeilingConfig, amount: u64) -> LedgerResult<(Self, u64)> {
        if amount == 0 {
            return Ok((*self, 0));
        }

        let raw = safe_add(self.raw, amount)?;
        let normalized = match config.dust_policy {
            DustPolicy::Reject => {
                if amount < config.divisor {
                    return Err(LedgerError::CapacityExceeded {
                        requested: amount,
                        limit: config.divisor,
                        reason: CapacityReason::DustBelowNormalization,
                    });
                }
                safe_add(self.normalized, div_up(amount, config.divisor)?)?
            }
            DustPolicy::RoundUp => safe_add(self.normalized, div_up(amount, config.divisor)?)?,
            DustPolicy::CarryRemainder => raw / config.divisor,
        };

        if normalized > config.ceiling {
            return Err(LedgerError::CapacityExceeded {
                requested: normalized,
                limit: config.ceiling,
                reason: CapacityReason::DebtCeiling,
            });
        }

        let increment = normalized - self.normalized;
        Ok((Self { normalized, raw }, increment))
    }

    /// Give back `principal` base units and the `units` their account held
    ///
    /// # Errors
    /// `Underflow` if more is released than was ever reserved.
    pub fn release(&self, config: &DebtCeilingConfig, principal: u64, units: u64) -> LedgerResult<Self> {
        let raw = safe_sub(self.raw, principal)?;
        let normalized = if config.dust_policy.charges_accounts() {
            safe_sub(self.normalized, units)?
        } else {
            raw / config.divisor
        };
        Ok(Self { normalized, raw })
    }

    /// Remaining capacity in normalized units
    pub fn headroom(&self, config: &DebtCeilingConfig) -> u64 {
        config.ceiling.saturating_sub(self.normalized)
    }
}

/// Units an account keeps when its principal shrinks to `remaining`
///
/// Rounds up, so an account never holds less than `ceil(remaining / divisor)`
/// and a fully repaid account holds nothing.
pub fn retained_units(units: u64, principal: u64, remaining: u64) -> LedgerResult<u64> {
    if remaining == 0 || principal == 0 {
        return Ok(0);
    }
    if remaining >= principal {
        return Ok(units);
    }
    mul_div_up(units, remaining, principal)
}

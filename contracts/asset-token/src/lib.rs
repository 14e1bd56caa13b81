//! Reference Asset Token
//!
//! In-memory fungible token used as the asset collaborator of the ledger
//! engines. It can charge a transfer fee, which is how the fee-on-transfer
//! accounting paths are exercised: the recipient is credited
//! `amount - fee` while the sender is debited the full `amount`.
//!
//! Holders can also transfer directly to a pool address. That is a
//! donation: the pool's balance grows without the pool's accounting being
//! told, exactly like a bare token transfer on chain.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tally_common::{
    errors::{LedgerError, LedgerResult},
    math::{apply_bps, safe_add, safe_sub},
    transfer::AssetTransfer,
    types::Address,
};

/// Maximum transfer fee (10%)
pub const MAX_TRANSFER_FEE_BPS: u64 = 1_000;

/// Balances captured by `checkpoint`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCheckpoint {
    balances: BTreeMap<Address, u64>,
    total_supply: u64,
}

/// Token state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AssetToken {
    /// Display symbol
    pub symbol: String,
    /// Decimal places
    pub decimals: u8,
    /// Fee charged on every transfer, in basis points of the amount
    pub transfer_fee_bps: u64,
    /// Receives transfer fees; fees are burned when `None`
    pub fee_collector: Option<Address>,
    balances: BTreeMap<Address, u64>,
    total_supply: u64,
}

impl AssetToken {
    /// Plain token without transfer fee
    pub fn new(symbol: &str, decimals: u8) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            transfer_fee_bps: 0,
            fee_collector: None,
            balances: BTreeMap::new(),
            total_supply: 0,
        }
    }

    /// Token that charges `fee_bps` on every transfer
    pub fn with_transfer_fee(symbol: &str, decimals: u8, fee_bps: u64) -> LedgerResult<Self> {
        if fee_bps > MAX_TRANSFER_FEE_BPS {
            return Err(LedgerError::InvalidParameter {
                param: "transfer_fee_bps",
                reason: "above maximum transfer fee",
            });
        }
        let mut token = Self::new(symbol, decimals);
        token.transfer_fee_bps = fee_bps;
        Ok(token)
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Create `amount` new units for `to`
    pub fn mint(&mut self, to: &Address, amount: u64) -> LedgerResult<()> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let new_supply = safe_add(self.total_supply, amount)?;
        let new_balance = safe_add(self.balance_of(to), amount)?;

        self.total_supply = new_supply;
        self.balances.insert(*to, new_balance);
        debug!(symbol = %self.symbol, amount, new_supply, "minted");
        Ok(())
    }

    /// Destroy `amount` units held by `from`
    pub fn burn(&mut self, from: &Address, amount: u64) -> LedgerResult<()> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance { available, requested: amount });
        }

        self.set_balance(from, available - amount);
        self.total_supply = safe_sub(self.total_supply, amount)?;
        Ok(())
    }

    /// Fee withheld from a transfer of `amount`
    pub fn fee_for(&self, amount: u64) -> LedgerResult<u64> {
        if self.transfer_fee_bps == 0 {
            return Ok(0);
        }
        apply_bps(amount, self.transfer_fee_bps)
    }

    fn set_balance(&mut self, holder: &Address, balance: u64) {
        if balance == 0 {
            self.balances.remove(holder);
        } else {
            self.balances.insert(*holder, balance);
        }
    }
}

impl AssetTransfer for AssetToken {
    type Checkpoint = TokenCheckpoint;

    fn balance_of(&self, holder: &Address) -> u64 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> LedgerResult<()> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance { available, requested: amount });
        }

        let fee = self.fee_for(amount)?;
        let credited = amount - fee;

        // Every new balance is computed before any is written, so a failed
        // credit leaves the sender untouched. A self-transfer nets out to `-fee`.
        let debited = |who: &Address| {
            if who == from {
                available - amount
            } else {
                self.balance_of(who)
            }
        };
        let to_balance = safe_add(debited(to), credited)?;
        let collector_balance = match self.fee_collector {
            Some(collector) if fee > 0 => {
                let base = if collector == *to { to_balance } else { debited(&collector) };
                Some((collector, safe_add(base, fee)?))
            }
            _ => None,
        };
        let total_supply = if fee > 0 && self.fee_collector.is_none() {
            safe_sub(self.total_supply, fee)?
        } else {
            self.total_supply
        };

        self.set_balance(from, available - amount);
        self.set_balance(to, to_balance);
        if let Some((collector, balance)) = collector_balance {
            self.set_balance(&collector, balance);
        }
        self.total_supply = total_supply;

        debug!(symbol = %self.symbol, amount, fee, "transfer");
        Ok(())
    }

    fn checkpoint(&self) -> Self::Checkpoint {
        TokenCheckpoint {
            balances: self.balances.clone(),
            total_supply: self.total_supply,
        }
    }

    fn rollback(&mut self, checkpoint: Self::Checkpoint) {
        self.balances = checkpoint.balances;
        self.total_supply = checkpoint.total_supply;
    }
}

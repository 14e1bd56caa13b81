//! Credit Engine
//!
//! Collateralized borrowing against a single collateral asset and a single
//! debt asset, held by the engine at its own address.
//!
//! ## Core Operations
//!
//! - **Deposit**: add collateral to an account (anyone can fund any account)
//! - **WithdrawCollateral**: remove collateral while the position stays covered
//! - **Borrow**: the owner draws debt up to the risk-weighted collateral value
//! - **Repay**: reduce debt by what the engine actually receives
//! - **Liquidate**: cover part of an unhealthy position's debt for collateral
//!   plus a bonus
//!
//! ## Accounting
//!
//! Debt is an interest-inclusive running balance. Interest is linear in
//! elapsed seconds and folded in by `accrue` at the top of every operation
//! that reads or changes debt. Queries compute the current debt as of `now`
//! without writing it back.
//!
//! Each account also keeps the principal it still owes. Repayments and
//! liquidations clear accrued interest first, and only principal counts
//! against the debt ceiling.
//!
//! Amounts are unit-agnostic: the liquidation threshold compares collateral
//! and debt base units directly. Price-denominated checks are layered on top
//! by integrators (see `tally-price-feed`).

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tally_common::{
    constants::{bps, credit},
    errors::{CapacityReason, LedgerError, LedgerResult},
    events::{EventLog, LedgerEvent},
    math::{
        calculate_health_factor, calculate_seizure, collateral_value, is_liquidatable,
        linear_interest, safe_add, safe_sub, to_u64,
    },
    store::{AccountStore, MemoryStore},
    transfer::{pull, push, with_rollback, AssetTransfer, TransferPolicy},
    types::{Address, CreditAccount, Timestamp},
};

pub mod ceiling;


pub use ceiling::{retained_units, CeilingUsage, DebtCeilingConfig, DustPolicy};

// ============ Configuration ============

/// Credit engine risk parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CreditConfig {
    /// Share of collateral that may be borrowed against (bps)
    pub liquidation_threshold_bps: u64,
    /// Extra collateral paid to liquidators (bps)
    pub liquidation_bonus_bps: u64,
    /// Annual simple interest rate (bps)
    pub rate_bps: u64,
    pub transfer_policy: TransferPolicy,
    /// Maximum total collateral held by the engine
    pub supply_cap: Option<u64>,
    pub debt_ceiling: Option<DebtCeilingConfig>,
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            liquidation_threshold_bps: credit::DEFAULT_LIQUIDATION_THRESHOLD_BPS,
            liquidation_bonus_bps: credit::DEFAULT_LIQUIDATION_BONUS_BPS,
            rate_bps: credit::DEFAULT_RATE_BPS,
            transfer_policy: TransferPolicy::default(),
            supply_cap: None,
            debt_ceiling: None,
        }
    }
}

impl CreditConfig {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.liquidation_threshold_bps == 0 || self.liquidation_threshold_bps > bps::MAX {
            return Err(LedgerError::InvalidParameter {
                param: "liquidation_threshold_bps",
                reason: "must be between 1 and 10000",
            });
        }
        if self.liquidation_bonus_bps > credit::MAX_LIQUIDATION_BONUS_BPS {
            return Err(LedgerError::InvalidParameter {
                param: "liquidation_bonus_bps",
                reason: "above maximum liquidation bonus",
            });
        }
        if self.rate_bps > credit::MAX_RATE_BPS {
            return Err(LedgerError::InvalidParameter {
                param: "rate_bps",
                reason: "above maximum interest rate",
            });
        }
        if self.supply_cap == Some(0) {
            return Err(LedgerError::InvalidParameter {
                param: "supply_cap",
                reason: "cap of zero would reject every deposit",
            });
        }
        if let Some(ceiling) = &self.debt_ceiling {
            ceiling.validate()?;
        }
        Ok(())
    }
}

// ============ Accrual ============

/// Fold interest accrued up to `now` into the account's debt
///
/// Pure: the caller decides whether to commit the result. A `now` earlier
/// than `last_accrual` accrues nothing and leaves the clock where it is.
pub fn accrue(account: &CreditAccount, now: Timestamp, config: &CreditConfig) -> LedgerResult<CreditAccount> {
    if now <= account.last_accrual {
        return Ok(*account);
    }

    let elapsed = now - account.last_accrual;
    let interest = linear_interest(account.debt, config.rate_bps, elapsed)?;

    Ok(CreditAccount {
        debt: safe_add(account.debt, interest)?,
        last_accrual: now,
        ..*account
    })
}

/// Outcome of a liquidation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liquidation {
    /// Debt extinguished (what the engine received)
    pub debt_covered: u64,
    /// Collateral paid to the liquidator
    pub collateral_seized: u64,
}

// ============ Engine ============

/// Credit engine over an injected account store
#[derive(Debug, Clone)]
pub struct CreditEngine<S = MemoryStore<CreditAccount>> {
    address: Address,
    config: CreditConfig,
    accounts: S,
    total_collateral: u64,
    ceiling_usage: CeilingUsage,
    events: EventLog,
}

impl CreditEngine<MemoryStore<CreditAccount>> {
    /// Empty engine holding assets at `address`
    pub fn new(address: Address, config: CreditConfig) -> LedgerResult<Self> {
        Self::with_store(address, config, MemoryStore::new())
    }
}

impl<S: AccountStore<CreditAccount>> CreditEngine<S> {
    /// Engine over a caller-provided store
    ///
    /// Aggregates are rebuilt from the stored accounts, which must then
    /// pass `check_invariants`.
    pub fn with_store(address: Address, config: CreditConfig, accounts: S) -> LedgerResult<Self> {
        config.validate()?;
        if address == [0u8; 32] {
            return Err(LedgerError::InvalidParameter {
                param: "address",
                reason: "engine address cannot be zero",
            });
        }

        let records = accounts.records();
        let total_collateral = to_u64(records.iter().map(|(_, a)| a.collateral as u128).sum())?;
        let ceiling_usage = match &config.debt_ceiling {
            Some(ceiling) => CeilingUsage::from_accounts(ceiling, records.iter().map(|(_, a)| a))?,
            None => CeilingUsage::default(),
        };

        let engine = Self {
            address,
            config,
            accounts,
            total_collateral,
            ceiling_usage,
            events: EventLog::new(),
        };
        engine.check_invariants()?;
        Ok(engine)
    }

    // ============ Queries ============

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn config(&self) -> &CreditConfig {
        &self.config
    }

    pub fn account(&self, account: &Address) -> Option<CreditAccount> {
        self.accounts.get(account)
    }

    pub fn accounts(&self) -> &S {
        &self.accounts
    }

    pub fn total_collateral(&self) -> u64 {
        self.total_collateral
    }

    pub fn ceiling_usage(&self) -> CeilingUsage {
        self.ceiling_usage
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Remove and return recorded events
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        self.events.drain()
    }

    /// Interest-inclusive debt as of `now` (not written back)
    pub fn current_debt(&self, account: &Address, now: Timestamp) -> LedgerResult<u64> {
        match self.accounts.get(account) {
            Some(record) => Ok(accrue(&record, now, &self.config)?.debt),
            None => Ok(0),
        }
    }

    /// Health factor as of `now` (1e18 = parity, `u128::MAX` without debt)
    ///
    /// Unknown accounts carry no debt.
    pub fn health_factor(&self, account: &Address, now: Timestamp) -> LedgerResult<u128> {
        let (collateral, debt) = self.position(account, now)?;
        calculate_health_factor(collateral, debt, self.config.liquidation_threshold_bps)
    }

    /// True when the debt as of `now` exceeds the risk-weighted collateral
    pub fn is_liquidatable(&self, account: &Address, now: Timestamp) -> LedgerResult<bool> {
        let (collateral, debt) = self.position(account, now)?;
        is_liquidatable(collateral, debt, self.config.liquidation_threshold_bps)
    }

    /// Additional debt `account` could draw at `now`
    pub fn available_to_borrow(&self, account: &Address, now: Timestamp) -> LedgerResult<u64> {
        let (collateral, debt) = self.position(account, now)?;
        let max = collateral_value(collateral, self.config.liquidation_threshold_bps)?;
        Ok(max.saturating_sub(debt))
    }

    fn position(&self, account: &Address, now: Timestamp) -> LedgerResult<(u64, u64)> {
        match self.accounts.get(account) {
            Some(record) => {
                let current = accrue(&record, now, &self.config)?;
                Ok((current.collateral, current.debt))
            }
            None => Ok((0, 0)),
        }
    }

    // ============ Operations ============

    /// Pull `amount` of collateral from `caller` into `account`
    ///
    /// Credits the amount actually received. Does not accrue interest.
    /// Returns the collateral credited.
    pub fn deposit<C: AssetTransfer>(
        &mut self,
        collateral_asset: &mut C,
        caller: &Address,
        account: &Address,
        amount: u64,
        now: Timestamp,
    ) -> LedgerResult<u64> {
        self.try_deposit(collateral_asset, caller, account, amount, now)
            .map_err(|err| rejected("deposit", err))
    }

    fn try_deposit<C: AssetTransfer>(
        &mut self,
        collateral_asset: &mut C,
        caller: &Address,
        account: &Address,
        amount: u64,
        now: Timestamp,
    ) -> LedgerResult<u64> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let record = self
            .accounts
            .get(account)
            .unwrap_or_else(|| CreditAccount::new(now));
        let address = self.address;
        let policy = self.config.transfer_policy;

        let (received, total_collateral, new_collateral) = with_rollback(collateral_asset, |asset| {
            let received = pull(asset, &address, caller, amount, policy)?;
            if received == 0 {
                return Err(LedgerError::ZeroAmount);
            }

            let total_collateral = safe_add(self.total_collateral, received)?;
            if let Some(cap) = self.config.supply_cap {
                if total_collateral > cap {
                    return Err(LedgerError::CapacityExceeded {
                        requested: total_collateral,
                        limit: cap,
                        reason: CapacityReason::SupplyCap,
                    });
                }
            }
            let new_collateral = safe_add(record.collateral, received)?;
            Ok((received, total_collateral, new_collateral))
        })?;

        self.accounts.put(*account, CreditAccount { collateral: new_collateral, ..record });
        self.total_collateral = total_collateral;
        self.events.emit(LedgerEvent::CollateralDeposited {
            account: *account,
            amount: received,
            new_collateral,
            timestamp: now,
        });

        debug!(requested = amount, received, new_collateral, "collateral deposited");
        Ok(received)
    }

    /// Return `amount` of collateral to the account owner
    ///
    /// # Errors
    /// - `NotAuthorized` unless `caller == account`
    /// - `InsufficientCollateral` if the remaining collateral would not
    ///   cover the accrued debt at the liquidation threshold
    pub fn withdraw_collateral<C: AssetTransfer>(
        &mut self,
        collateral_asset: &mut C,
        caller: &Address,
        account: &Address,
        amount: u64,
        now: Timestamp,
    ) -> LedgerResult<u64> {
        self.try_withdraw_collateral(collateral_asset, caller, account, amount, now)
            .map_err(|err| rejected("withdraw_collateral", err))
    }

    fn try_withdraw_collateral<C: AssetTransfer>(
        &mut self,
        collateral_asset: &mut C,
        caller: &Address,
        account: &Address,
        amount: u64,
        now: Timestamp,
    ) -> LedgerResult<u64> {
        if caller != account {
            return Err(LedgerError::NotAuthorized {
                owner: *account,
                caller: *caller,
            });
        }
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let record = self.load(account)?;
        let current = accrue(&record, now, &self.config)?;

        if amount > current.collateral {
            return Err(LedgerError::InsufficientCollateral {
                needed: amount,
                available: current.collateral,
            });
        }
        let remaining = current.collateral - amount;
        let covered = collateral_value(remaining, self.config.liquidation_threshold_bps)?;
        if current.debt > covered {
            return Err(LedgerError::InsufficientCollateral {
                needed: current.debt,
                available: covered,
            });
        }

        let address = self.address;
        let policy = self.config.transfer_policy;
        let (sent, new_collateral, total_collateral) = with_rollback(collateral_asset, |asset| {
            let sent = push(asset, &address, caller, amount, policy)?;
            let new_collateral = safe_sub(current.collateral, sent)?;
            let total_collateral = safe_sub(self.total_collateral, sent)?;
            Ok((sent, new_collateral, total_collateral))
        })?;

        self.emit_accrual(account, &record, &current, now);
        self.accounts.put(*account, CreditAccount { collateral: new_collateral, ..current });
        self.total_collateral = total_collateral;
        self.events.emit(LedgerEvent::CollateralWithdrawn {
            account: *account,
            amount: sent,
            new_collateral,
            timestamp: now,
        });

        debug!(amount = sent, new_collateral, debt = current.debt, "collateral withdrawn");
        Ok(sent)
    }

    /// Draw `amount` of debt against `account` and pay it to its owner
    ///
    /// Borrowing zero only folds accrued interest into the debt.
    ///
    /// # Errors
    /// - `NotAuthorized` unless `caller == account`
    /// - `AccountNotFound` if the account never deposited
    /// - `InsufficientCollateral` if the new debt would exceed the
    ///   risk-weighted collateral value
    /// - `CapacityExceeded` under the debt ceiling rules
    pub fn borrow<D: AssetTransfer>(
        &mut self,
        debt_asset: &mut D,
        caller: &Address,
        account: &Address,
        amount: u64,
        now: Timestamp,
    ) -> LedgerResult<u64> {
        self.try_borrow(debt_asset, caller, account, amount, now)
            .map_err(|err| rejected("borrow", err))
    }

    fn try_borrow<D: AssetTransfer>(
        &mut self,
        debt_asset: &mut D,
        caller: &Address,
        account: &Address,
        amount: u64,
        now: Timestamp,
    ) -> LedgerResult<u64> {
        if caller != account {
            return Err(LedgerError::NotAuthorized {
                owner: *account,
                caller: *caller,
            });
        }

        let record = self.load(account)?;
        let current = accrue(&record, now, &self.config)?;

        if amount == 0 {
            self.emit_accrual(account, &record, &current, now);
            self.accounts.put(*account, current);
            return Ok(0);
        }

        let max = collateral_value(current.collateral, self.config.liquidation_threshold_bps)?;
        let new_debt = safe_add(current.debt, amount)?;
        if new_debt > max {
            return Err(LedgerError::InsufficientCollateral {
                needed: new_debt,
                available: max,
            });
        }

        let (ceiling_usage, normalized_increment, units) = match &self.config.debt_ceiling {
            Some(ceiling) => {
                let (usage, increment) = self.ceiling_usage.reserve(ceiling, amount)?;
                let units = if ceiling.dust_policy.charges_accounts() { increment } else { 0 };
                (usage, increment, units)
            }
            None => (self.ceiling_usage, 0, 0),
        };
        let updated = CreditAccount {
            debt: new_debt,
            principal: safe_add(current.principal, amount)?,
            ceiling_units: safe_add(current.ceiling_units, units)?,
            ..current
        };

        let address = self.address;
        let policy = self.config.transfer_policy;
        with_rollback(debt_asset, |asset| push(asset, &address, account, amount, policy))?;

        self.emit_accrual(account, &record, &current, now);
        self.accounts.put(*account, updated);
        self.ceiling_usage = ceiling_usage;
        self.events.emit(LedgerEvent::Borrowed {
            account: *account,
            amount,
            new_debt,
            normalized_increment,
            timestamp: now,
        });

        debug!(amount, new_debt, normalized_increment, "borrowed");
        Ok(amount)
    }

    /// Repay up to `amount` of `account`'s debt from `caller`
    ///
    /// Overpayment is clamped to the accrued debt. Returns the amount
    /// applied, which is what the engine actually received.
    pub fn repay<D: AssetTransfer>(
        &mut self,
        debt_asset: &mut D,
        caller: &Address,
        account: &Address,
        amount: u64,
        now: Timestamp,
    ) -> LedgerResult<u64> {
        self.try_repay(debt_asset, caller, account, amount, now)
            .map_err(|err| rejected("repay", err))
    }

    fn try_repay<D: AssetTransfer>(
        &mut self,
        debt_asset: &mut D,
        caller: &Address,
        account: &Address,
        amount: u64,
        now: Timestamp,
    ) -> LedgerResult<u64> {
        let record = self.load(account)?;
        let current = accrue(&record, now, &self.config)?;
        let to_pay = amount.min(current.debt);

        let address = self.address;
        let policy = self.config.transfer_policy;
        let (received, settled, ceiling_usage) = with_rollback(debt_asset, |asset| {
            let received = pull(asset, &address, caller, to_pay, policy)?;
            let new_debt = safe_sub(current.debt, received)?;
            let (settled, ceiling_usage) = self.settle_debt(&current, new_debt)?;
            Ok((received, settled, ceiling_usage))
        })?;
        let new_debt = settled.debt;

        self.emit_accrual(account, &record, &current, now);
        self.accounts.put(*account, settled);
        self.ceiling_usage = ceiling_usage;
        if received > 0 {
            self.events.emit(LedgerEvent::Repaid {
                account: *account,
                payer: *caller,
                amount: received,
                new_debt,
                timestamp: now,
            });
        }

        debug!(requested = amount, applied = received, new_debt, "repaid");
        Ok(received)
    }

    /// Cover `debt_to_cover` of an unhealthy position in exchange for
    /// collateral plus the liquidation bonus
    ///
    /// # Errors
    /// - `ZeroAmount` if `debt_to_cover` is zero
    /// - `PositionHealthy` unless the accrued position is liquidatable
    /// - `ExceedsMaximum` if `debt_to_cover` exceeds the accrued debt
    /// - `InsufficientCollateral` if the seizure exceeds the collateral
    pub fn liquidate<C: AssetTransfer, D: AssetTransfer>(
        &mut self,
        collateral_asset: &mut C,
        debt_asset: &mut D,
        liquidator: &Address,
        account: &Address,
        debt_to_cover: u64,
        now: Timestamp,
    ) -> LedgerResult<Liquidation> {
        self.try_liquidate(collateral_asset, debt_asset, liquidator, account, debt_to_cover, now)
            .map_err(|err| rejected("liquidate", err))
    }

    fn try_liquidate<C: AssetTransfer, D: AssetTransfer>(
        &mut self,
        collateral_asset: &mut C,
        debt_asset: &mut D,
        liquidator: &Address,
        account: &Address,
        debt_to_cover: u64,
        now: Timestamp,
    ) -> LedgerResult<Liquidation> {
        if debt_to_cover == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let record = self.load(account)?;
        let current = accrue(&record, now, &self.config)?;
        let lt_bps = self.config.liquidation_threshold_bps;

        if !is_liquidatable(current.collateral, current.debt, lt_bps)? {
            return Err(LedgerError::PositionHealthy {
                health_factor: calculate_health_factor(current.collateral, current.debt, lt_bps)?,
            });
        }
        if debt_to_cover > current.debt {
            return Err(LedgerError::ExceedsMaximum {
                amount: debt_to_cover,
                maximum: current.debt,
            });
        }

        let bonus_bps = self.config.liquidation_bonus_bps;
        let seize = calculate_seizure(debt_to_cover, bonus_bps)?;
        if seize > current.collateral {
            return Err(LedgerError::InsufficientCollateral {
                needed: seize,
                available: current.collateral,
            });
        }

        let address = self.address;
        let policy = self.config.transfer_policy;
        let liquidated = with_rollback(collateral_asset, |collateral_asset| {
            with_rollback(debt_asset, |debt_asset| {
                let covered = pull(debt_asset, &address, liquidator, debt_to_cover, policy)?;
                if covered == 0 {
                    return Err(LedgerError::ZeroAmount);
                }
                // A short delivery only buys the collateral it paid for
                let seize = if covered < debt_to_cover {
                    calculate_seizure(covered, bonus_bps)?
                } else {
                    seize
                };
                let seized = push(collateral_asset, &address, liquidator, seize, policy)?;

                let new_debt = safe_sub(current.debt, covered)?;
                let new_collateral = safe_sub(current.collateral, seized)?;
                let total_collateral = safe_sub(self.total_collateral, seized)?;
                let (settled, ceiling_usage) = self.settle_debt(&current, new_debt)?;
                let outcome = Liquidation {
                    debt_covered: covered,
                    collateral_seized: seized,
                };
                let settled = CreditAccount {
                    collateral: new_collateral,
                    ..settled
                };
                Ok((outcome, settled, total_collateral, ceiling_usage))
            })
        })?;
        let (outcome, settled, total_collateral, ceiling_usage) = liquidated;
        let new_debt = settled.debt;
        let new_collateral = settled.collateral;

        self.emit_accrual(account, &record, &current, now);
        self.accounts.put(*account, settled);
        self.total_collateral = total_collateral;
        self.ceiling_usage = ceiling_usage;
        self.events.emit(LedgerEvent::Liquidated {
            account: *account,
            liquidator: *liquidator,
            debt_covered: outcome.debt_covered,
            collateral_seized: outcome.collateral_seized,
            timestamp: now,
        });

        debug!(
            debt_covered = outcome.debt_covered,
            collateral_seized = outcome.collateral_seized,
            new_debt,
            new_collateral,
            "liquidated"
        );
        Ok(outcome)
    }

    // ============ Invariants ============

    /// Verify that recorded aggregates match the stored accounts
    ///
    /// Ceiling usage must equal what the accounts hold, every account must
    /// hold at least `ceil(principal / divisor)` units under `Reject` and
    /// `RoundUp`, and the total must stay within the ceiling.
    pub fn check_invariants(&self) -> LedgerResult<()> {
        let records = self.accounts.records();
        let summed: u128 = records.iter().map(|(_, a)| a.collateral as u128).sum();
        let summed = to_u64(summed)?;
        if summed != self.total_collateral {
            return Err(LedgerError::ConservationViolated {
                recorded: self.total_collateral,
                summed,
            });
        }

        for (_, account) in &records {
            if account.principal > account.debt {
                return Err(LedgerError::ExceedsMaximum {
                    amount: account.principal,
                    maximum: account.debt,
                });
            }
        }

        if let Some(ceiling) = &self.config.debt_ceiling {
            let derived = CeilingUsage::from_accounts(ceiling, records.iter().map(|(_, a)| a))?;
            if derived.normalized != self.ceiling_usage.normalized {
                return Err(LedgerError::CeilingDrift {
                    recorded: self.ceiling_usage.normalized,
                    derived: derived.normalized,
                });
            }
            if derived.raw != self.ceiling_usage.raw {
                return Err(LedgerError::CeilingDrift {
                    recorded: self.ceiling_usage.raw,
                    derived: derived.raw,
                });
            }
            for (_, account) in &records {
                let minimum = ceiling.minimum_units(account.principal)?;
                if account.ceiling_units < minimum {
                    return Err(LedgerError::CeilingDrift {
                        recorded: account.ceiling_units,
                        derived: minimum,
                    });
                }
            }
            if self.ceiling_usage.normalized > ceiling.ceiling {
                return Err(LedgerError::CapacityExceeded {
                    requested: self.ceiling_usage.normalized,
                    limit: ceiling.ceiling,
                    reason: CapacityReason::DebtCeiling,
                });
            }
        }
        Ok(())
    }

    // ============ Internal ============

    fn load(&self, account: &Address) -> LedgerResult<CreditAccount> {
        self.accounts
            .get(account)
            .ok_or(LedgerError::AccountNotFound { account: *account })
    }

    fn emit_accrual(&mut self, account: &Address, before: &CreditAccount, after: &CreditAccount, now: Timestamp) {
        let interest = after.debt - before.debt;
        if interest > 0 {
            self.events.emit(LedgerEvent::InterestAccrued {
                account: *account,
                interest,
                new_debt: after.debt,
                timestamp: now,
            });
        }
    }

    /// Account and ceiling usage once `account`'s debt falls to `new_debt`
    ///
    /// Accrued interest is cleared before principal; the ceiling gets back
    /// only the principal and units this account held.
    fn settle_debt(&self, account: &CreditAccount, new_debt: u64) -> LedgerResult<(CreditAccount, CeilingUsage)> {
        let principal = account.principal.min(new_debt);
        let ceiling_units = retained_units(account.ceiling_units, account.principal, principal)?;
        let ceiling_usage = match &self.config.debt_ceiling {
            Some(ceiling) => self.ceiling_usage.release(
                ceiling,
                safe_sub(account.principal, principal)?,
                safe_sub(account.ceiling_units, ceiling_units)?,
            )?,
            None => self.ceiling_usage,
        };

        let settled = CreditAccount {
            debt: new_debt,
            principal,
            ceiling_units,
            ..*account
        };
        Ok((settled, ceiling_usage))
    }
}

fn rejected(operation: &'static str, err: LedgerError) -> LedgerError {
    warn!(operation, code = err.code(), error = %err, "credit operation rejected");
    err
}

// ============ Tests ============

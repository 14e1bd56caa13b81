//! Share Vault Ledger
//!
//! Converts between a pool's underlying asset balance and proportional claim
//! units ("shares").
//!
//! ## Guarantees
//!
//! - **Conservation**: `total_shares` always equals the sum of holder balances
//! - **Solvency**: rounding always favours the pool, so outstanding claims
//!   never exceed `total_assets`
//! - **Loud zero-share failures**: a deposit that would mint nothing fails
//!   with `ZeroShares` and moves no assets
//! - **Measured transfers**: assets are credited by the amount the pool
//!   actually received, never the amount requested
//! - **Atomicity**: a failed operation leaves the pool, the holder records,
//!   and the asset balances unchanged
//!
//! ## Inflation exposure
//!
//! Anyone can transfer assets to the pool address without minting shares.
//! The ledger cannot tell such a donation from yield and does not try to:
//! once `sync` adopts the inflated balance, small deposits round to zero
//! shares and fail with `ZeroShares`. Minimum-liquidity locking or virtual
//! share offsets are deployment policy and live outside this crate.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tally_common::{
    errors::{CapacityReason, LedgerError, LedgerResult},
    events::{EventLog, LedgerEvent},
    math::{safe_add, safe_sub, to_u64},
    store::{AccountStore, MemoryStore},
    transfer::{pull, push, with_rollback, AssetTransfer, TransferPolicy},
    types::{Address, Pool, ShareAccount},
};

pub mod conversion;


use conversion::{to_assets, to_shares, Rounding};

// ============ Configuration ============

/// Share vault configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct VaultConfig {
    /// Treatment of fee-bearing or rebasing assets
    pub transfer_policy: TransferPolicy,
    /// Upper bound on `total_assets` reachable through deposit or mint
    pub max_total_assets: Option<u64>,
}

impl VaultConfig {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.max_total_assets == Some(0) {
            return Err(LedgerError::InvalidParameter {
                param: "max_total_assets",
                reason: "cap of zero would reject every deposit",
            });
        }
        Ok(())
    }
}

/// Assets and shares moved by a `mint`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Assets received by the pool
    pub assets: u64,
    /// Shares credited to the receiver
    pub shares: u64,
}

// ============ Ledger ============

/// Share vault over an injected account store
#[derive(Debug, Clone)]
pub struct ShareLedger<S = MemoryStore<ShareAccount>> {
    address: Address,
    config: VaultConfig,
    pool: Pool,
    accounts: S,
    events: EventLog,
}

impl ShareLedger<MemoryStore<ShareAccount>> {
    /// Empty vault holding its assets at `address`
    pub fn new(address: Address, config: VaultConfig) -> LedgerResult<Self> {
        Self::with_store(address, config, MemoryStore::new())
    }
}

impl<S: AccountStore<ShareAccount>> ShareLedger<S> {
    /// Empty vault over a caller-provided store
    pub fn with_store(address: Address, config: VaultConfig, accounts: S) -> LedgerResult<Self> {
        Self::from_parts(address, config, Pool::new(), accounts)
    }

    /// Rebuild a vault from previously saved state
    ///
    /// # Errors
    /// `ConservationViolated` / `SolvencyViolated` if `pool` does not match
    /// the balances in `accounts`.
    pub fn from_parts(address: Address, config: VaultConfig, pool: Pool, accounts: S) -> LedgerResult<Self> {
        config.validate()?;
        if address == [0u8; 32] {
            return Err(LedgerError::InvalidParameter {
                param: "address",
                reason: "vault address cannot be zero",
            });
        }

        let ledger = Self {
            address,
            config,
            pool,
            accounts,
            events: EventLog::new(),
        };
        ledger.check_invariants()?;
        Ok(ledger)
    }

    // ============ Queries ============

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn pool(&self) -> Pool {
        self.pool
    }

    pub fn total_assets(&self) -> u64 {
        self.pool.total_assets
    }

    pub fn total_shares(&self) -> u64 {
        self.pool.total_shares
    }

    pub fn shares_of(&self, owner: &Address) -> u64 {
        self.accounts.get(owner).map(|a| a.shares).unwrap_or(0)
    }

    pub fn accounts(&self) -> &S {
        &self.accounts
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Remove and return recorded events
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        self.events.drain()
    }

    /// `floor(assets * total_shares / total_assets)`, 1:1 for an empty pool
    pub fn convert_to_shares(&self, assets: u64) -> LedgerResult<u64> {
        to_shares(&self.pool, assets, Rounding::Down)
    }

    /// `floor(shares * total_assets / total_shares)`, 1:1 for an empty pool
    pub fn convert_to_assets(&self, shares: u64) -> LedgerResult<u64> {
        to_assets(&self.pool, shares, Rounding::Down)
    }

    /// Shares a deposit of `assets` would mint
    pub fn preview_deposit(&self, assets: u64) -> LedgerResult<u64> {
        self.convert_to_shares(assets)
    }

    /// Assets a `mint` of `shares` would pull (rounded up)
    pub fn preview_mint(&self, shares: u64) -> LedgerResult<u64> {
        to_assets(&self.pool, shares, Rounding::Up)
    }

    /// Shares a `withdraw` of `assets` would burn (rounded up)
    pub fn preview_withdraw(&self, assets: u64) -> LedgerResult<u64> {
        to_shares(&self.pool, assets, Rounding::Up)
    }

    /// Assets a redemption of `shares` would pay
    pub fn preview_redeem(&self, shares: u64) -> LedgerResult<u64> {
        self.convert_to_assets(shares)
    }

    pub fn max_redeem(&self, owner: &Address) -> u64 {
        self.shares_of(owner)
    }

    pub fn max_withdraw(&self, owner: &Address) -> LedgerResult<u64> {
        self.convert_to_assets(self.shares_of(owner))
    }

    // ============ Operations ============

    /// Pull `assets` from `caller` and mint shares to `receiver`
    ///
    /// Returns the shares minted, always non-zero.
    ///
    /// # Errors
    /// - `ZeroShares` if the requested or the received amount would mint
    ///   nothing (no assets move)
    /// - `CapacityExceeded` if `max_total_assets` would be exceeded
    /// - `TransferMismatch` in strict mode when the asset withholds a fee
    pub fn deposit<A: AssetTransfer>(
        &mut self,
        asset: &mut A,
        caller: &Address,
        assets: u64,
        receiver: &Address,
    ) -> LedgerResult<u64> {
        self.try_deposit(asset, caller, assets, receiver)
            .map_err(|err| rejected("deposit", err))
    }

    fn try_deposit<A: AssetTransfer>(
        &mut self,
        asset: &mut A,
        caller: &Address,
        assets: u64,
        receiver: &Address,
    ) -> LedgerResult<u64> {
        let pool = self.pool;

        // Quote on the requested amount first so a hopeless deposit never
        // touches the asset
        if to_shares(&pool, assets, Rounding::Down)? == 0 {
            return Err(LedgerError::ZeroShares { assets });
        }

        let address = self.address;
        let policy = self.config.transfer_policy;
        let receiver_shares = self.shares_of(receiver);

        let (received, shares, new_pool, new_balance) = with_rollback(asset, |asset| {
            let received = pull(asset, &address, caller, assets, policy)?;

            let shares = to_shares(&pool, received, Rounding::Down)?;
            if shares == 0 {
                return Err(LedgerError::ZeroShares { assets: received });
            }

            let new_pool = Pool {
                total_assets: safe_add(pool.total_assets, received)?,
                total_shares: safe_add(pool.total_shares, shares)?,
            };
            self.check_deposit_cap(new_pool.total_assets)?;
            let new_balance = safe_add(receiver_shares, shares)?;

            Ok((received, shares, new_pool, new_balance))
        })?;

        self.accounts.put(*receiver, ShareAccount { shares: new_balance });
        self.pool = new_pool;
        self.events.emit(LedgerEvent::Deposit {
            caller: *caller,
            receiver: *receiver,
            assets: received,
            shares,
        });

        debug!(
            requested = assets,
            received,
            shares,
            total_assets = new_pool.total_assets,
            total_shares = new_pool.total_shares,
            "deposit"
        );
        Ok(shares)
    }

    /// Mint exactly `shares` to `receiver`, pulling the rounded-up asset cost
    ///
    /// With a fee-bearing asset in tolerant mode the shares credited are
    /// recomputed from what the pool received and may be fewer than
    /// requested; the returned `Settlement` reports what actually happened.
    pub fn mint<A: AssetTransfer>(
        &mut self,
        asset: &mut A,
        caller: &Address,
        shares: u64,
        receiver: &Address,
    ) -> LedgerResult<Settlement> {
        self.try_mint(asset, caller, shares, receiver)
            .map_err(|err| rejected("mint", err))
    }

    fn try_mint<A: AssetTransfer>(
        &mut self,
        asset: &mut A,
        caller: &Address,
        shares: u64,
        receiver: &Address,
    ) -> LedgerResult<Settlement> {
        if shares == 0 {
            return Err(LedgerError::ZeroShares { assets: 0 });
        }

        let pool = self.pool;
        let cost = to_assets(&pool, shares, Rounding::Up)?;
        if cost == 0 {
            // Shares backed by nothing cannot be sold for nothing
            return Err(LedgerError::ZeroAmount);
        }

        let address = self.address;
        let policy = self.config.transfer_policy;
        let receiver_shares = self.shares_of(receiver);

        let (settlement, new_pool, new_balance) = with_rollback(asset, |asset| {
            let received = pull(asset, &address, caller, cost, policy)?;

            let minted = if received >= cost {
                shares
            } else {
                to_shares(&pool, received, Rounding::Down)?.min(shares)
            };
            if minted == 0 {
                return Err(LedgerError::ZeroShares { assets: received });
            }

            let new_pool = Pool {
                total_assets: safe_add(pool.total_assets, received)?,
                total_shares: safe_add(pool.total_shares, minted)?,
            };
            self.check_deposit_cap(new_pool.total_assets)?;
            let new_balance = safe_add(receiver_shares, minted)?;

            let settlement = Settlement { assets: received, shares: minted };
            Ok((settlement, new_pool, new_balance))
        })?;

        self.accounts.put(*receiver, ShareAccount { shares: new_balance });
        self.pool = new_pool;
        self.events.emit(LedgerEvent::Deposit {
            caller: *caller,
            receiver: *receiver,
            assets: settlement.assets,
            shares: settlement.shares,
        });

        debug!(cost, assets = settlement.assets, shares = settlement.shares, "mint");
        Ok(settlement)
    }

    /// Burn `shares` held by `owner` and pay their value to `receiver`
    ///
    /// Redeeming zero shares is a no-op returning zero.
    ///
    /// # Errors
    /// - `NotAuthorized` unless `caller == owner`
    /// - `InsufficientBalance` if `owner` holds fewer than `shares`
    pub fn redeem<A: AssetTransfer>(
        &mut self,
        asset: &mut A,
        caller: &Address,
        shares: u64,
        receiver: &Address,
        owner: &Address,
    ) -> LedgerResult<u64> {
        self.try_redeem(asset, caller, shares, receiver, owner)
            .map_err(|err| rejected("redeem", err))
    }

    fn try_redeem<A: AssetTransfer>(
        &mut self,
        asset: &mut A,
        caller: &Address,
        shares: u64,
        receiver: &Address,
        owner: &Address,
    ) -> LedgerResult<u64> {
        ensure_owner(caller, owner)?;
        if shares == 0 {
            return Ok(0);
        }

        let assets = to_assets(&self.pool, shares, Rounding::Down)?;
        self.settle_exit(asset, caller, receiver, owner, assets, shares)
    }

    /// Pay exactly `assets` to `receiver`, burning the rounded-up share cost
    ///
    /// Returns the shares burned.
    pub fn withdraw<A: AssetTransfer>(
        &mut self,
        asset: &mut A,
        caller: &Address,
        assets: u64,
        receiver: &Address,
        owner: &Address,
    ) -> LedgerResult<u64> {
        self.try_withdraw(asset, caller, assets, receiver, owner)
            .map_err(|err| rejected("withdraw", err))
    }

    fn try_withdraw<A: AssetTransfer>(
        &mut self,
        asset: &mut A,
        caller: &Address,
        assets: u64,
        receiver: &Address,
        owner: &Address,
    ) -> LedgerResult<u64> {
        ensure_owner(caller, owner)?;
        if assets == 0 {
            return Ok(0);
        }

        let shares = to_shares(&self.pool, assets, Rounding::Up)?;
        self.settle_exit(asset, caller, receiver, owner, assets, shares)?;
        Ok(shares)
    }

    /// Burn `shares` from `owner` and push `assets` out of the pool
    fn settle_exit<A: AssetTransfer>(
        &mut self,
        asset: &mut A,
        caller: &Address,
        receiver: &Address,
        owner: &Address,
        assets: u64,
        shares: u64,
    ) -> LedgerResult<u64> {
        let held = self.shares_of(owner);
        if held < shares {
            return Err(LedgerError::InsufficientBalance {
                available: held,
                requested: shares,
            });
        }

        let pool = self.pool;
        let remaining = held - shares;
        let total_shares = safe_sub(pool.total_shares, shares)?;
        let address = self.address;
        let policy = self.config.transfer_policy;

        let (sent, total_assets) = with_rollback(asset, |asset| {
            let sent = push(asset, &address, receiver, assets, policy)?;
            let total_assets = safe_sub(pool.total_assets, sent)?;
            Ok((sent, total_assets))
        })?;

        if remaining == 0 {
            self.accounts.remove(owner);
        } else {
            self.accounts.put(*owner, ShareAccount { shares: remaining });
        }
        self.pool = Pool { total_assets, total_shares };
        self.events.emit(LedgerEvent::Withdraw {
            caller: *caller,
            receiver: *receiver,
            owner: *owner,
            assets: sent,
            shares,
        });

        debug!(assets = sent, shares, total_assets, total_shares, "exit");
        Ok(sent)
    }

    // ============ External Value Events ============

    /// Record yield that arrived in the pool without minting shares
    pub fn report_yield(&mut self, amount: u64) -> LedgerResult<()> {
        if amount == 0 {
            return Err(rejected("report_yield", LedgerError::ZeroAmount));
        }
        let total_assets = safe_add(self.pool.total_assets, amount)
            .map_err(|err| rejected("report_yield", err))?;

        self.pool.total_assets = total_assets;
        self.events.emit(LedgerEvent::YieldReported { amount, total_assets });
        debug!(amount, total_assets, "yield reported");
        Ok(())
    }

    /// Record a loss of pool assets without burning shares
    pub fn report_loss(&mut self, amount: u64) -> LedgerResult<()> {
        if amount > self.pool.total_assets {
            return Err(rejected(
                "report_loss",
                LedgerError::ExceedsMaximum {
                    amount,
                    maximum: self.pool.total_assets,
                },
            ));
        }

        let total_assets = self.pool.total_assets - amount;
        self.pool.total_assets = total_assets;
        self.events.emit(LedgerEvent::LossReported { amount, total_assets });
        warn!(amount, total_assets, "loss reported");
        Ok(())
    }

    /// Adopt the pool's measured asset balance as `total_assets`
    ///
    /// Donations become visible to the share price here.
    pub fn sync<A: AssetTransfer>(&mut self, asset: &A) -> u64 {
        let previous = self.pool.total_assets;
        let total_assets = asset.balance_of(&self.address);

        self.pool.total_assets = total_assets;
        self.events.emit(LedgerEvent::BalanceSynced { previous, total_assets });
        debug!(previous, total_assets, "balance synced");
        total_assets
    }

    // ============ Invariants ============

    /// Verify share conservation and solvency
    pub fn check_invariants(&self) -> LedgerResult<()> {
        let records = self.accounts.records();

        let summed: u128 = records.iter().map(|(_, a)| a.shares as u128).sum();
        let summed = to_u64(summed)?;
        if summed != self.pool.total_shares {
            return Err(LedgerError::ConservationViolated {
                recorded: self.pool.total_shares,
                summed,
            });
        }

        let mut claims: u128 = 0;
        for (_, account) in &records {
            claims += to_assets(&self.pool, account.shares, Rounding::Down)? as u128;
        }
        let claims = to_u64(claims)?;
        if !self.pool.is_bootstrap() && claims > self.pool.total_assets {
            return Err(LedgerError::SolvencyViolated {
                claims,
                total_assets: self.pool.total_assets,
            });
        }

        Ok(())
    }

    fn check_deposit_cap(&self, new_total_assets: u64) -> LedgerResult<()> {
        match self.config.max_total_assets {
            Some(limit) if new_total_assets > limit => Err(LedgerError::CapacityExceeded {
                requested: new_total_assets,
                limit,
                reason: CapacityReason::DepositCap,
            }),
            _ => Ok(()),
        }
    }
}

fn ensure_owner(caller: &Address, owner: &Address) -> LedgerResult<()> {
    if caller != owner {
        return Err(LedgerError::NotAuthorized {
            owner: *owner,
            caller: *caller,
        });
    }
    Ok(())
}

fn rejected(operation: &'static str, err: LedgerError) -> LedgerError {
    warn!(operation, code = err.code(), error = %err, "share vault operation rejected");
    err
}

// ============ Tests ============

#[cfg(test)]
mod tests {
    use super::*;
    use tally_asset_token::AssetToken;
    use tally_common::events::EventType;

    const VAULT: Address = [9u8; 32];

    fn alice() -> Address {
        [1u8; 32]
    }

    fn bob() -> Address {
        [2u8; 32]
    }

    fn setup() -> (ShareLedger, AssetToken) {
        let ledger = ShareLedger::new(VAULT, VaultConfig::default()).unwrap();
        let mut token = AssetToken::new("USD", 6);
        token.mint(&alice(), 1_000_000).unwrap();
        token.mint(&bob(), 1_000_000).unwrap();
        (ledger, token)
    }

    #[test]
    fn test_bootstrap_deposit_and_redeem() {
        let (mut ledger, mut token) = setup();

        let shares = ledger.deposit(&mut token, &alice(), 500, &alice()).unwrap();
        assert_eq!(shares, 500);
        assert_eq!(ledger.total_assets(), 500);
        assert_eq!(ledger.total_shares(), 500);

        let assets = ledger.redeem(&mut token, &alice(), 500, &alice(), &alice()).unwrap();
        assert_eq!(assets, 500);
        assert_eq!(ledger.total_shares(), 0);
        assert_eq!(ledger.shares_of(&alice()), 0);
        assert_eq!(token.balance_of(&alice()), 1_000_000);
        assert!(ledger.accounts().is_empty());
    }

    #[test]
    fn test_deposit_to_other_receiver() {
        let (mut ledger, mut token) = setup();
        ledger.deposit(&mut token, &alice(), 100, &bob()).unwrap();
        assert_eq!(ledger.shares_of(&bob()), 100);
        assert_eq!(ledger.shares_of(&alice()), 0);
        assert_eq!(token.balance_of(&alice()), 999_900);
    }

    #[test]
    fn test_zero_deposit_fails_loudly() {
        let (mut ledger, mut token) = setup();
        let result = ledger.deposit(&mut token, &alice(), 0, &alice());
        assert_eq!(result, Err(LedgerError::ZeroShares { assets: 0 }));
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_inflation_attack_fails_loudly() {
        let (mut ledger, mut token) = setup();

        // Attacker seeds one share, then donates directly to the vault
        ledger.deposit(&mut token, &alice(), 1, &alice()).unwrap();
        token.transfer(&alice(), &VAULT, 999).unwrap();
        ledger.sync(&token);
        assert_eq!(ledger.pool(), Pool { total_assets: 1_000, total_shares: 1 });

        // Victim deposit rounds to zero shares and is refused, nothing moves
        let before = token.balance_of(&bob());
        let result = ledger.deposit(&mut token, &bob(), 1, &bob());
        assert_eq!(result, Err(LedgerError::ZeroShares { assets: 1 }));
        let result = ledger.deposit(&mut token, &bob(), 999, &bob());
        assert_eq!(result, Err(LedgerError::ZeroShares { assets: 999 }));

        assert_eq!(token.balance_of(&bob()), before);
        assert_eq!(ledger.shares_of(&bob()), 0);
        assert_eq!(ledger.total_assets(), 1_000);

        // A deposit large enough for one share still goes through
        assert_eq!(ledger.deposit(&mut token, &bob(), 1_000, &bob()).unwrap(), 1);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_fee_on_transfer_credits_received() {
        let mut ledger = ShareLedger::new(VAULT, VaultConfig::default()).unwrap();
        let mut token = AssetToken::with_transfer_fee("FOT", 6, 200).unwrap();
        token.mint(&alice(), 10_000).unwrap();

        // Nominal 100 delivers 98
        let shares = ledger.deposit(&mut token, &alice(), 100, &alice()).unwrap();
        assert_eq!(shares, 98);
        assert_eq!(ledger.total_assets(), 98);
        assert_eq!(token.balance_of(&VAULT), 98);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_fee_on_transfer_into_priced_pool() {
        let mut ledger = ShareLedger::new(VAULT, VaultConfig::default()).unwrap();
        let mut token = AssetToken::with_transfer_fee("FOT", 6, 200).unwrap();
        token.mint(&alice(), 100_000).unwrap();
        token.mint(&bob(), 100_000).unwrap();

        // 5000 nominal -> 4900 received, 4900 shares
        ledger.deposit(&mut token, &alice(), 5_000, &alice()).unwrap();
        // 1000 nominal -> 980 received; 980 * 4900 / 4900 = 980 shares, not 1000
        let shares = ledger.deposit(&mut token, &bob(), 1_000, &bob()).unwrap();
        assert_eq!(shares, 980);
        assert_eq!(ledger.total_assets(), token.balance_of(&VAULT));
    }

    #[test]
    fn test_strict_mode_rejects_fee_and_rolls_back() {
        let config = VaultConfig {
            transfer_policy: TransferPolicy::Strict,
            ..Default::default()
        };
        let mut ledger = ShareLedger::new(VAULT, config).unwrap();
        let mut token = AssetToken::with_transfer_fee("FOT", 6, 200).unwrap();
        token.mint(&alice(), 10_000).unwrap();

        let result = ledger.deposit(&mut token, &alice(), 100, &alice());
        assert_eq!(result, Err(LedgerError::TransferMismatch { requested: 100, observed: 98 }));
        assert_eq!(token.balance_of(&alice()), 10_000);
        assert_eq!(token.balance_of(&VAULT), 0);
        assert_eq!(ledger.total_assets(), 0);
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_redeem_requires_owner() {
        let (mut ledger, mut token) = setup();
        ledger.deposit(&mut token, &alice(), 100, &alice()).unwrap();

        let result = ledger.redeem(&mut token, &bob(), 100, &bob(), &alice());
        assert_eq!(result, Err(LedgerError::NotAuthorized { owner: alice(), caller: bob() }));
        assert_eq!(ledger.shares_of(&alice()), 100);
    }

    #[test]
    fn test_redeem_zero_is_noop() {
        let (mut ledger, mut token) = setup();
        ledger.deposit(&mut token, &alice(), 100, &alice()).unwrap();
        let events_before = ledger.events().len();

        assert_eq!(ledger.redeem(&mut token, &alice(), 0, &alice(), &alice()).unwrap(), 0);
        assert_eq!(ledger.events().len(), events_before);
        assert_eq!(ledger.total_shares(), 100);
    }

    #[test]
    fn test_redeem_more_than_held() {
        let (mut ledger, mut token) = setup();
        ledger.deposit(&mut token, &alice(), 100, &alice()).unwrap();

        let result = ledger.redeem(&mut token, &alice(), 101, &alice(), &alice());
        assert_eq!(result, Err(LedgerError::InsufficientBalance { available: 100, requested: 101 }));
    }

    #[test]
    fn test_redeem_to_other_receiver() {
        let (mut ledger, mut token) = setup();
        ledger.deposit(&mut token, &alice(), 100, &alice()).unwrap();
        ledger.redeem(&mut token, &alice(), 40, &bob(), &alice()).unwrap();

        assert_eq!(token.balance_of(&bob()), 1_000_040);
        assert_eq!(ledger.shares_of(&alice()), 60);
    }

    #[test]
    fn test_withdraw_rounds_shares_up() {
        let (mut ledger, mut token) = setup();
        ledger.deposit(&mut token, &alice(), 100, &alice()).unwrap();
        ledger.report_yield(50).unwrap();
        token.mint(&VAULT, 50).unwrap();

        // 10 assets at 1.5 per share = 6.67 shares, burned as 7
        assert_eq!(ledger.preview_withdraw(10).unwrap(), 7);
        let burned = ledger.withdraw(&mut token, &alice(), 10, &alice(), &alice()).unwrap();
        assert_eq!(burned, 7);
        assert_eq!(ledger.shares_of(&alice()), 93);
        assert_eq!(ledger.total_assets(), 140);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_mint_rounds_assets_up() {
        let (mut ledger, mut token) = setup();
        ledger.deposit(&mut token, &alice(), 100, &alice()).unwrap();
        ledger.report_yield(50).unwrap();
        token.mint(&VAULT, 50).unwrap();

        // 7 shares at 1.5 = 10.5 assets, charged 11
        assert_eq!(ledger.preview_mint(7).unwrap(), 11);
        let settlement = ledger.mint(&mut token, &bob(), 7, &bob()).unwrap();
        assert_eq!(settlement, Settlement { assets: 11, shares: 7 });
        assert_eq!(token.balance_of(&bob()), 1_000_000 - 11);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_mint_zero_shares_rejected() {
        let (mut ledger, mut token) = setup();
        let result = ledger.mint(&mut token, &alice(), 0, &alice());
        assert_eq!(result, Err(LedgerError::ZeroShares { assets: 0 }));
    }

    #[test]
    fn test_deposit_cap() {
        let config = VaultConfig {
            max_total_assets: Some(1_000),
            ..Default::default()
        };
        let mut ledger = ShareLedger::new(VAULT, config).unwrap();
        let mut token = AssetToken::new("USD", 6);
        token.mint(&alice(), 10_000).unwrap();

        ledger.deposit(&mut token, &alice(), 600, &alice()).unwrap();
        let result = ledger.deposit(&mut token, &alice(), 401, &alice());
        assert_eq!(
            result,
            Err(LedgerError::CapacityExceeded {
                requested: 1_001,
                limit: 1_000,
                reason: CapacityReason::DepositCap,
            })
        );
        // The pull was rolled back
        assert_eq!(token.balance_of(&alice()), 9_400);
        assert_eq!(token.balance_of(&VAULT), 600);

        ledger.deposit(&mut token, &alice(), 400, &alice()).unwrap();
        assert_eq!(ledger.total_assets(), 1_000);
    }

    #[test]
    fn test_zero_cap_rejected() {
        let config = VaultConfig {
            max_total_assets: Some(0),
            ..Default::default()
        };
        assert!(ShareLedger::new(VAULT, config).is_err());
        assert!(ShareLedger::new([0u8; 32], VaultConfig::default()).is_err());
    }

    #[test]
    fn test_loss_lowers_share_value() {
        let (mut ledger, mut token) = setup();
        ledger.deposit(&mut token, &alice(), 1_000, &alice()).unwrap();
        ledger.report_loss(400).unwrap();

        assert_eq!(ledger.convert_to_assets(1_000).unwrap(), 600);
        assert_eq!(ledger.max_withdraw(&alice()).unwrap(), 600);
        ledger.check_invariants().unwrap();

        let result = ledger.report_loss(601);
        assert_eq!(result, Err(LedgerError::ExceedsMaximum { amount: 601, maximum: 600 }));
    }

    #[test]
    fn test_wiped_pool_refuses_deposits() {
        let (mut ledger, mut token) = setup();
        ledger.deposit(&mut token, &alice(), 1_000, &alice()).unwrap();
        ledger.report_loss(1_000).unwrap();

        let result = ledger.deposit(&mut token, &bob(), 100, &bob());
        assert_eq!(result, Err(LedgerError::DivisionByZero));
        assert_eq!(ledger.shares_of(&bob()), 0);
    }

    #[test]
    fn test_yield_raises_share_value() {
        let (mut ledger, mut token) = setup();
        ledger.deposit(&mut token, &alice(), 1_000, &alice()).unwrap();
        token.mint(&VAULT, 500).unwrap();
        assert_eq!(ledger.sync(&token), 1_500);

        assert_eq!(ledger.convert_to_assets(1_000).unwrap(), 1_500);
        assert_eq!(ledger.redeem(&mut token, &alice(), 1_000, &alice(), &alice()).unwrap(), 1_500);
    }

    #[test]
    fn test_events_recorded_on_success_only() {
        let (mut ledger, mut token) = setup();
        ledger.deposit(&mut token, &alice(), 100, &alice()).unwrap();
        let _ = ledger.redeem(&mut token, &bob(), 10, &bob(), &alice());
        ledger.redeem(&mut token, &alice(), 10, &alice(), &alice()).unwrap();

        assert_eq!(ledger.events().filter_by_type(EventType::Deposit).len(), 1);
        assert_eq!(ledger.events().filter_by_type(EventType::Withdraw).len(), 1);
        assert_eq!(ledger.drain_events().len(), 2);
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_from_parts_checks_conservation() {
        let mut store = MemoryStore::new();
        store.put(alice(), ShareAccount { shares: 10 });

        let pool = Pool { total_assets: 10, total_shares: 11 };
        let result = ShareLedger::from_parts(VAULT, VaultConfig::default(), pool, store.clone());
        assert_eq!(result.err(), Some(LedgerError::ConservationViolated { recorded: 11, summed: 10 }));

        let pool = Pool { total_assets: 10, total_shares: 10 };
        assert!(ShareLedger::from_parts(VAULT, VaultConfig::default(), pool, store).is_ok());
    }
}

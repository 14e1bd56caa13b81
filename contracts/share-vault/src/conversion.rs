//! Asset/share conversion
//!
//! Pure functions over a `Pool` snapshot. The share price is never stored;
//! every conversion goes through these two functions with an explicit
//! rounding direction.
//!
//! | Operation | Converts        | Rounding |
//! |-----------|-----------------|----------|
//! | deposit   | assets → shares | down     |
//! | redeem    | shares → assets | down     |
//! | mint      | shares → assets | up       |
//! | withdraw  | assets → shares | up       |

use tally_common::{
    errors::LedgerResult,
    math::{mul_div_down, mul_div_up},
    types::Pool,
};

/// Rounding direction of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// Shares worth `assets` at the pool's current ratio
///
/// An empty pool (no shares outstanding) converts 1:1. A pool whose shares
/// are backed by zero assets cannot price a deposit and fails with
/// `DivisionByZero`.
pub fn to_shares(pool: &Pool, assets: u64, rounding: Rounding) -> LedgerResult<u64> {
    if pool.is_bootstrap() {
        return Ok(assets);
    }
    match rounding {
        Rounding::Down => mul_div_down(assets, pool.total_shares, pool.total_assets),
        Rounding::Up => mul_div_up(assets, pool.total_shares, pool.total_assets),
    }
}

/// Assets worth `shares` at the pool's current ratio
pub fn to_assets(pool: &Pool, shares: u64, rounding: Rounding) -> LedgerResult<u64> {
    if pool.is_bootstrap() {
        return Ok(shares);
    }
    match rounding {
        Rounding::Down => mul_div_down(shares, pool.total_assets, pool.total_shares),
        Rounding::Up => mul_div_up(shares, pool.total_assets, pool.total_shares),
    }
}

//! Value Source Boundary
//!
//! The ledger math is denomination-agnostic and never reads a price. This
//! trait is the contract an integrator implements to layer price-denominated
//! checks on top of the engines.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::LedgerResult;
use crate::types::Timestamp;

/// A value reported by a price source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PriceReading {
    /// Reported value (8 decimals)
    pub value: u64,
    /// Time the source last updated the value
    pub updated_at: Timestamp,
}

impl PriceReading {
    pub fn new(value: u64, updated_at: Timestamp) -> Self {
        Self { value, updated_at }
    }

    /// Seconds since the reading was produced (0 if produced in the future)
    pub fn age(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.updated_at)
    }
}

/// Source of the current value of an asset
pub trait ValueSource {
    fn current_value(&self) -> LedgerResult<PriceReading>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_age() {
        let reading = PriceReading::new(100, 1_000);
        assert_eq!(reading.age(1_600), 600);
        assert_eq!(reading.age(900), 0);
    }
}

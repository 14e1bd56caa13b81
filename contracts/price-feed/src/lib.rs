//! Price Feed
//!
//! Reference value source for integrators layering price-denominated checks
//! on top of the ledger engines. A trusted operator pushes readings; readers
//! classify each reading against an expected range and a maximum age.
//!
//! ## Guarding operations
//!
//! `PriceGuard` refuses only operations that can make a position riskier
//! (`Borrow`, `WithdrawCollateral`) while the price is unusable. Deposits,
//! repayments and liquidations are always admitted: blocking them on a bad
//! price would trap positions that need to be closed.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tally_common::{
    constants::oracle::MAX_PRICE_AGE_SECS,
    errors::{LedgerError, LedgerResult},
    events::{EventLog, LedgerEvent},
    oracle::{PriceReading, ValueSource},
    types::{Address, OperationKind, Timestamp},
};

// ============ Bounds ============

/// Expected range and freshness of a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PriceBounds {
    /// Lowest plausible value (inclusive)
    pub min_value: u64,
    /// Highest plausible value (inclusive)
    pub max_value: u64,
    /// Seconds after which a reading is stale
    pub max_age: u64,
}

impl Default for PriceBounds {
    fn default() -> Self {
        Self {
            min_value: 1,
            max_value: u64::MAX,
            max_age: MAX_PRICE_AGE_SECS,
        }
    }
}

impl PriceBounds {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.min_value == 0 {
            return Err(LedgerError::InvalidParameter {
                param: "min_value",
                reason: "a zero price is never plausible",
            });
        }
        if self.min_value > self.max_value {
            return Err(LedgerError::InvalidParameter {
                param: "max_value",
                reason: "below min_value",
            });
        }
        if self.max_age == 0 {
            return Err(LedgerError::InvalidParameter {
                param: "max_age",
                reason: "every reading would be stale",
            });
        }
        Ok(())
    }

    /// Classify `reading` as of `now`
    ///
    /// A value outside the range is reported as `OutOfRange` even when it
    /// is also stale.
    pub fn classify(&self, reading: &PriceReading, now: Timestamp) -> PriceStatus {
        if reading.value < self.min_value || reading.value > self.max_value {
            PriceStatus::OutOfRange
        } else if reading.age(now) > self.max_age {
            PriceStatus::Stale
        } else {
            PriceStatus::Fresh
        }
    }
}

/// Usability of a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum PriceStatus {
    Fresh,
    OutOfRange,
    Stale,
}

impl PriceStatus {
    pub fn is_fresh(&self) -> bool {
        *self == Self::Fresh
    }
}

// ============ Feed ============

/// Operator-updated price feed
#[derive(Debug, Clone)]
pub struct PriceFeed {
    /// Only address allowed to push readings
    pub operator: Address,
    pub bounds: PriceBounds,
    reading: PriceReading,
    events: EventLog,
}

impl PriceFeed {
    /// Feed seeded with `initial_value` at time `now`
    pub fn new(operator: Address, initial_value: u64, now: Timestamp, bounds: PriceBounds) -> LedgerResult<Self> {
        bounds.validate()?;
        if operator == [0u8; 32] {
            return Err(LedgerError::InvalidParameter {
                param: "operator",
                reason: "operator cannot be zero address",
            });
        }
        if initial_value == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        Ok(Self {
            operator,
            bounds,
            reading: PriceReading::new(initial_value, now),
            events: EventLog::new(),
        })
    }

    pub fn reading(&self) -> PriceReading {
        self.reading
    }

    pub fn status(&self, now: Timestamp) -> PriceStatus {
        self.bounds.classify(&self.reading, now)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Push a new reading
    ///
    /// Out-of-range values are recorded; readers see them classified as
    /// `OutOfRange`.
    ///
    /// # Errors
    /// - `NotAuthorized` unless `caller` is the operator
    /// - `ZeroAmount` for a zero value
    /// - `InvalidParameter` if `now` precedes the current reading
    pub fn update(&mut self, caller: &Address, value: u64, now: Timestamp) -> LedgerResult<()> {
        if *caller != self.operator {
            return Err(LedgerError::NotAuthorized {
                owner: self.operator,
                caller: *caller,
            });
        }
        if value == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if now < self.reading.updated_at {
            return Err(LedgerError::InvalidParameter {
                param: "now",
                reason: "reading older than the current one",
            });
        }

        let old_value = self.reading.value;
        self.reading = PriceReading::new(value, now);
        self.events.emit(LedgerEvent::PriceUpdated {
            old_value,
            new_value: value,
            timestamp: now,
        });

        let status = self.status(now);
        if status.is_fresh() {
            debug!(old_value, new_value = value, "price updated");
        } else {
            warn!(old_value, new_value = value, ?status, "price updated outside expected range");
        }
        Ok(())
    }

    /// Hand operation to a new address
    pub fn set_operator(&mut self, caller: &Address, new_operator: Address) -> LedgerResult<()> {
        if *caller != self.operator {
            return Err(LedgerError::NotAuthorized {
                owner: self.operator,
                caller: *caller,
            });
        }
        if new_operator == [0u8; 32] {
            return Err(LedgerError::InvalidParameter {
                param: "new_operator",
                reason: "operator cannot be zero address",
            });
        }
        self.operator = new_operator;
        Ok(())
    }
}

impl ValueSource for PriceFeed {
    fn current_value(&self) -> LedgerResult<PriceReading> {
        Ok(self.reading)
    }
}

// ============ Guard ============

/// Admission check in front of the credit engine
pub struct PriceGuard<'a, V: ValueSource> {
    source: &'a V,
    bounds: PriceBounds,
}

impl<'a, V: ValueSource> PriceGuard<'a, V> {
    pub fn new(source: &'a V, bounds: PriceBounds) -> Self {
        Self { source, bounds }
    }

    /// Admit or refuse `operation` given the price as of `now`
    ///
    /// Returns the price status for operations that are admitted.
    ///
    /// # Errors
    /// `UnsafePrice` for a risk-increasing operation on a non-fresh price.
    pub fn check(&self, operation: OperationKind, now: Timestamp) -> LedgerResult<PriceStatus> {
        let reading = self.source.current_value()?;
        let status = self.bounds.classify(&reading, now);

        if operation.increases_risk() && !status.is_fresh() {
            warn!(?operation, ?status, value = reading.value, "operation refused on unusable price");
            return Err(LedgerError::UnsafePrice {
                value: reading.value,
                age: reading.age(now),
            });
        }
        Ok(status)
    }
}

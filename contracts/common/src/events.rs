//! Ledger Events
//!
//! Events are recorded by each engine after an operation commits and can be
//! drained by the integrator for indexing, analytics, or persistence. A
//! failed operation records nothing.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{Address, Timestamp};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Share Vault Events (0x01 - 0x1F)
    Deposit = 0x01,
    Withdraw = 0x02,
    YieldReported = 0x03,
    LossReported = 0x04,
    BalanceSynced = 0x05,

    // Credit Events (0x20 - 0x3F)
    CollateralDeposited = 0x20,
    CollateralWithdrawn = 0x21,
    InterestAccrued = 0x22,
    Borrowed = 0x23,
    Repaid = 0x24,
    Liquidated = 0x25,

    // Price Events (0x40 - 0x5F)
    PriceUpdated = 0x40,
}

/// Main event enum containing all ledger events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum LedgerEvent {
    // ============ Share Vault Events ============

    /// Shares minted against assets pulled into the pool
    Deposit {
        caller: Address,
        receiver: Address,
        assets: u64,
        shares: u64,
    },

    /// Shares burned and assets paid out of the pool
    Withdraw {
        caller: Address,
        receiver: Address,
        owner: Address,
        assets: u64,
        shares: u64,
    },

    /// Pool assets increased without minting shares
    YieldReported { amount: u64, total_assets: u64 },

    /// Pool assets decreased without burning shares
    LossReported { amount: u64, total_assets: u64 },

    /// Pool adopted its measured asset balance
    BalanceSynced { previous: u64, total_assets: u64 },

    // ============ Credit Events ============

    CollateralDeposited {
        account: Address,
        amount: u64,
        new_collateral: u64,
        timestamp: Timestamp,
    },

    CollateralWithdrawn {
        account: Address,
        amount: u64,
        new_collateral: u64,
        timestamp: Timestamp,
    },

    /// Interest folded into an account's debt
    InterestAccrued {
        account: Address,
        interest: u64,
        new_debt: u64,
        timestamp: Timestamp,
    },

    Borrowed {
        account: Address,
        amount: u64,
        new_debt: u64,
        /// Increment recorded against the debt ceiling (0 without a ceiling)
        normalized_increment: u64,
        timestamp: Timestamp,
    },

    Repaid {
        account: Address,
        payer: Address,
        amount: u64,
        new_debt: u64,
        timestamp: Timestamp,
    },

    Liquidated {
        account: Address,
        liquidator: Address,
        debt_covered: u64,
        collateral_seized: u64,
        timestamp: Timestamp,
    },

    // ============ Price Events ============

    PriceUpdated {
        old_value: u64,
        new_value: u64,
        timestamp: Timestamp,
    },
}

impl LedgerEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Deposit { .. } => EventType::Deposit,
            Self::Withdraw { .. } => EventType::Withdraw,
            Self::YieldReported { .. } => EventType::YieldReported,
            Self::LossReported { .. } => EventType::LossReported,
            Self::BalanceSynced { .. } => EventType::BalanceSynced,
            Self::CollateralDeposited { .. } => EventType::CollateralDeposited,
            Self::CollateralWithdrawn { .. } => EventType::CollateralWithdrawn,
            Self::InterestAccrued { .. } => EventType::InterestAccrued,
            Self::Borrowed { .. } => EventType::Borrowed,
            Self::Repaid { .. } => EventType::Repaid,
            Self::Liquidated { .. } => EventType::Liquidated,
            Self::PriceUpdated { .. } => EventType::PriceUpdated,
        }
    }

    /// Caller-supplied time of the event, if the emitting engine is clocked
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::CollateralDeposited { timestamp, .. }
            | Self::CollateralWithdrawn { timestamp, .. }
            | Self::InterestAccrued { timestamp, .. }
            | Self::Borrowed { timestamp, .. }
            | Self::Repaid { timestamp, .. }
            | Self::Liquidated { timestamp, .. }
            | Self::PriceUpdated { timestamp, .. } => Some(*timestamp),
            _ => None,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log owned by an engine instance
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Record an event
    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Remove and return all recorded events
    pub fn drain(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&LedgerEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

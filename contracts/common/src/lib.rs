//! Tally Common Library
//!
//! Shared types, constants, and utilities for the Tally ledger engines.
//!
//! ## Contents
//!
//! - **Math**: checked arithmetic with an explicit rounding direction on
//!   every division, health factor, liquidation seizure, linear interest
//! - **Errors**: one `LedgerError` enum; every failure aborts the operation
//! - **Events**: typed event log recorded by the engines after a commit
//! - **Store**: key-value account store owned by an engine instance
//! - **Transfer**: the asset boundary, measuring what actually moved
//! - **Oracle**: the value-source boundary used by integrators

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod events;
pub mod store;
pub mod transfer;
pub mod oracle;

// Re-exports for convenience
pub use errors::*;
pub use types::*;
pub use math::*;
pub use events::*;
pub use store::*;
pub use transfer::*;
pub use oracle::*;

//! Rewards ledger core for Mosq.
//!
//! This crate is the heart of Mosq. It provides:
//! - [`UserLedger`]: idempotent user creation with one-time referral credit,
//!   game-round settlement, gated task-completion credit, daily check-in
//! - [`TaskCatalog`]: idempotent task registration and lookup
//! - [`Clock`]: the calendar source for check-in arithmetic
//!
//! Every mutation is a single atomic record-store update. Store failures are
//! classified into [`LedgerError`] here and never escape raw.

pub mod catalog;
pub mod clock;
pub mod error;
pub mod users;

#[cfg(test)]
mod testing;

pub use catalog::{Registration, TaskCatalog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{LedgerError, LedgerResult};
pub use users::{Completion, CreateOutcome, UserLedger};

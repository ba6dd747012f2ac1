//! Foundation types for the Mosq rewards ledger.
//!
//! This crate provides the identity and record types shared by every other
//! Mosq crate. It has no knowledge of storage; records are plain serde
//! structs whose field names match the persisted document layout.
//!
//! # Key Types
//!
//! - [`Uid`]: Externally supplied user identity (chat id or username)
//! - [`TaskName`]: Unique human-readable task key
//! - [`User`]: A user's ledger: balance, fleet, referrals, completions
//! - [`Task`]: A completable task and its reward value

pub mod error;
pub mod identity;
pub mod task;
pub mod user;

pub use error::TypeError;
pub use identity::{TaskName, Uid};
pub use task::Task;
pub use user::{
    User, DEFAULT_FLEET, PREMIUM_TASK_POINT, REFERRAL_BONUS, STANDARD_TASK_POINT,
};

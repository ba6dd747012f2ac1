//! Reward engine for Mosq.
//!
//! Composes the [`UserLedger`] and [`TaskCatalog`] behind one entry point
//! for the chat bot and the HTTP API. The engine holds no state of its own
//! and never retries; it sequences ledger calls and maps their outcomes.

pub mod engine;
pub mod error;
pub mod referral;

pub use engine::{Onboarding, RewardEngine, DEFAULT_FALLBACK_INVITOR};
pub use error::{EngineError, EngineResult};
pub use referral::referral_token;

// Re-export key types
pub use mosq_ledger::{
    Clock, Completion, CreateOutcome, FixedClock, Registration, SystemClock, TaskCatalog,
    UserLedger,
};
pub use mosq_store::{InMemoryRecordStore, MongoRecordStore, RecordStore};
pub use mosq_types::{Task, TaskName, Uid, User};

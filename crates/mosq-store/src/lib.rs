//! Record storage for the Mosq rewards ledger.
//!
//! The ledger keeps two keyed collections, `users` and `tasks`. This crate
//! defines the primitives the ledger is allowed to use against them and the
//! backends that provide those primitives.
//!
//! # Primitives
//!
//! - insert-if-absent keyed on the unique field (`uid`, `task_name`)
//! - lookup by key and example-based listing
//! - conditional single-document update combining increments, `$set` and
//!   set-insertion, reporting whether the filter matched
//!
//! # Storage Backends
//!
//! All backends implement the [`RecordStore`] trait:
//!
//! - [`InMemoryRecordStore`] -- `HashMap`-based store for tests and embedding
//! - [`MongoRecordStore`] -- MongoDB collections with unique indexes
//!
//! # Design Rules
//!
//! 1. Every mutating primitive touches exactly one document and is atomic.
//! 2. A conditional update either applies all of its operators or none.
//! 3. Unique-key conflicts surface as [`StoreError::DuplicateKey`], distinct
//!    from backend unavailability.
//! 4. An increment that would leave the `i64` range is rejected as
//!    [`StoreError::Overflow`] and writes nothing.
//! 5. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod mongo;
pub mod query;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryRecordStore;
pub use mongo::{MongoRecordStore, TASK_COLLECTION, USER_COLLECTION};
pub use query::{InsertOutcome, TaskQuery, TaskUpdate, UpdateOutcome, UserFilter, UserUpdate};
pub use traits::RecordStore;

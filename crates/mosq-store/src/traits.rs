use async_trait::async_trait;
use mosq_types::{Task, TaskName, Uid, User};

use crate::error::StoreResult;
use crate::query::{InsertOutcome, TaskQuery, TaskUpdate, UpdateOutcome, UserFilter, UserUpdate};

/// Keyed document store holding the `users` and `tasks` collections.
///
/// All implementations must satisfy these invariants:
/// - At most one user per `uid` and one task per `task_name`.
/// - Insert-if-absent never overwrites an existing document.
/// - A conditional update evaluates its filter and applies its operators as
///   one atomic step on one document. Concurrent updates on the same
///   document serialize.
/// - All backend errors are propagated, never silently ignored.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert `user` unless a user with the same `uid` exists.
    ///
    /// A backend that detects the conflict only through its unique index
    /// returns [`StoreError::DuplicateKey`](crate::StoreError::DuplicateKey).
    async fn insert_user_if_absent(&self, user: &User) -> StoreResult<InsertOutcome>;

    /// Read a user by uid. Returns `Ok(None)` if absent.
    async fn find_user(&self, uid: &Uid) -> StoreResult<Option<User>>;

    /// Read every user document, in no particular order.
    async fn find_users(&self) -> StoreResult<Vec<User>>;

    /// Apply `update` to the user selected by `filter`.
    async fn update_user(
        &self,
        filter: &UserFilter,
        update: &UserUpdate,
    ) -> StoreResult<UpdateOutcome>;

    /// Apply `update` and return the document as it is after the update.
    ///
    /// Returns `Ok(None)` if the filter matched nothing.
    async fn find_and_update_user(
        &self,
        filter: &UserFilter,
        update: &UserUpdate,
    ) -> StoreResult<Option<User>>;

    /// Insert `task` unless a task with the same name exists.
    async fn insert_task_if_absent(&self, task: &Task) -> StoreResult<InsertOutcome>;

    /// Read a task by name. Returns `Ok(None)` if absent.
    async fn find_task(&self, name: &TaskName) -> StoreResult<Option<Task>>;

    /// Read every task matching `query`, in no particular order.
    async fn find_tasks(&self, query: &TaskQuery) -> StoreResult<Vec<Task>>;

    /// Apply `update` to the named task.
    async fn update_task(&self, name: &TaskName, update: &TaskUpdate)
        -> StoreResult<UpdateOutcome>;

    /// Provision the unique keys. Backends without indexes do nothing.
    async fn ensure_indexes(&self) -> StoreResult<()> {
        Ok(())
    }
}

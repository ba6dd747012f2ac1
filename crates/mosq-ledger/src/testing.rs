//! Store doubles for exercising failure classification.

use async_trait::async_trait;
use mosq_store::{
    InMemoryRecordStore, InsertOutcome, RecordStore, StoreError, StoreResult, TaskQuery,
    TaskUpdate, UpdateOutcome, UserFilter, UserUpdate,
};
use mosq_types::{Task, TaskName, Uid, User};

/// Every call fails as if the backend were down.
pub struct DownStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("connection refused".into()))
}

#[async_trait]
impl RecordStore for DownStore {
    async fn insert_user_if_absent(&self, _user: &User) -> StoreResult<InsertOutcome> {
        down()
    }
    async fn find_user(&self, _uid: &Uid) -> StoreResult<Option<User>> {
        down()
    }
    async fn find_users(&self) -> StoreResult<Vec<User>> {
        down()
    }
    async fn update_user(&self, _f: &UserFilter, _u: &UserUpdate) -> StoreResult<UpdateOutcome> {
        down()
    }
    async fn find_and_update_user(
        &self,
        _f: &UserFilter,
        _u: &UserUpdate,
    ) -> StoreResult<Option<User>> {
        down()
    }
    async fn insert_task_if_absent(&self, _task: &Task) -> StoreResult<InsertOutcome> {
        down()
    }
    async fn find_task(&self, _name: &TaskName) -> StoreResult<Option<Task>> {
        down()
    }
    async fn find_tasks(&self, _q: &TaskQuery) -> StoreResult<Vec<Task>> {
        down()
    }
    async fn update_task(&self, _n: &TaskName, _u: &TaskUpdate) -> StoreResult<UpdateOutcome> {
        down()
    }
}

/// Behaves like the in-memory store, except that inserts lose a simulated
/// race: the unique index rejects them even though a lookup beforehand
/// would have found nothing.
#[derive(Default)]
pub struct RacyStore {
    pub inner: InMemoryRecordStore,
}

#[async_trait]
impl RecordStore for RacyStore {
    async fn insert_user_if_absent(&self, user: &User) -> StoreResult<InsertOutcome> {
        Err(StoreError::DuplicateKey {
            collection: "users",
            key: user.uid.to_string(),
        })
    }
    async fn find_user(&self, uid: &Uid) -> StoreResult<Option<User>> {
        self.inner.find_user(uid).await
    }
    async fn find_users(&self) -> StoreResult<Vec<User>> {
        self.inner.find_users().await
    }
    async fn update_user(&self, f: &UserFilter, u: &UserUpdate) -> StoreResult<UpdateOutcome> {
        self.inner.update_user(f, u).await
    }
    async fn find_and_update_user(
        &self,
        f: &UserFilter,
        u: &UserUpdate,
    ) -> StoreResult<Option<User>> {
        self.inner.find_and_update_user(f, u).await
    }
    async fn insert_task_if_absent(&self, task: &Task) -> StoreResult<InsertOutcome> {
        // The racing writer's copy lands before ours is rejected.
        self.inner.insert_task_if_absent(task).await?;
        Err(StoreError::DuplicateKey {
            collection: "tasks",
            key: task.task_name.to_string(),
        })
    }
    async fn find_task(&self, name: &TaskName) -> StoreResult<Option<Task>> {
        self.inner.find_task(name).await
    }
    async fn find_tasks(&self, q: &TaskQuery) -> StoreResult<Vec<Task>> {
        self.inner.find_tasks(q).await
    }
    async fn update_task(&self, n: &TaskName, u: &TaskUpdate) -> StoreResult<UpdateOutcome> {
        self.inner.update_task(n, u).await
    }
}

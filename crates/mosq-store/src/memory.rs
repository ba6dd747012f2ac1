use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use mosq_types::{Task, TaskName, Uid, User};

use crate::error::{StoreError, StoreResult};
use crate::query::{InsertOutcome, TaskQuery, TaskUpdate, UpdateOutcome, UserFilter, UserUpdate};
use crate::traits::RecordStore;

/// In-memory, HashMap-based record store.
///
/// Intended for tests and embedding. Each collection sits behind its own
/// `RwLock`; every mutating primitive runs under the write lock, which makes
/// it atomic with respect to every other call. Records are cloned on
/// read/write. Data is lost when the store is dropped.
pub struct InMemoryRecordStore {
    users: RwLock<HashMap<Uid, User>>,
    tasks: RwLock<HashMap<TaskName, Task>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}

impl InMemoryRecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of user records.
    pub fn user_count(&self) -> usize {
        self.users.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Number of task records.
    pub fn task_count(&self) -> usize {
        self.tasks.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Overwrite or insert a user as-is. Bypasses insert-if-absent; used to
    /// seed fixtures.
    pub fn put_user(&self, user: User) -> StoreResult<()> {
        let mut users = self.users.write().map_err(poisoned)?;
        users.insert(user.uid.clone(), user);
        Ok(())
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_user_if_absent(&self, user: &User) -> StoreResult<InsertOutcome> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users.contains_key(&user.uid) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        users.insert(user.uid.clone(), user.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn find_user(&self, uid: &Uid) -> StoreResult<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(uid).cloned())
    }

    async fn find_users(&self) -> StoreResult<Vec<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.values().cloned().collect())
    }

    async fn update_user(
        &self,
        filter: &UserFilter,
        update: &UserUpdate,
    ) -> StoreResult<UpdateOutcome> {
        let mut users = self.users.write().map_err(poisoned)?;
        match users.get_mut(&filter.uid) {
            Some(user) if filter.matches(user) => Ok(UpdateOutcome {
                matched: true,
                modified: update.apply(user)?,
            }),
            _ => Ok(UpdateOutcome::NO_MATCH),
        }
    }

    async fn find_and_update_user(
        &self,
        filter: &UserFilter,
        update: &UserUpdate,
    ) -> StoreResult<Option<User>> {
        let mut users = self.users.write().map_err(poisoned)?;
        match users.get_mut(&filter.uid) {
            Some(user) if filter.matches(user) => {
                update.apply(user)?;
                Ok(Some(user.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn insert_task_if_absent(&self, task: &Task) -> StoreResult<InsertOutcome> {
        let mut tasks = self.tasks.write().map_err(poisoned)?;
        if tasks.contains_key(&task.task_name) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        tasks.insert(task.task_name.clone(), task.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn find_task(&self, name: &TaskName) -> StoreResult<Option<Task>> {
        let tasks = self.tasks.read().map_err(poisoned)?;
        Ok(tasks.get(name).cloned())
    }

    async fn find_tasks(&self, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let tasks = self.tasks.read().map_err(poisoned)?;
        Ok(tasks.values().filter(|t| query.matches(t)).cloned().collect())
    }

    async fn update_task(
        &self,
        name: &TaskName,
        update: &TaskUpdate,
    ) -> StoreResult<UpdateOutcome> {
        let mut tasks = self.tasks.write().map_err(poisoned)?;
        match tasks.get_mut(name) {
            Some(task) => Ok(UpdateOutcome {
                matched: true,
                modified: update.apply(task)?,
            }),
            None => Ok(UpdateOutcome::NO_MATCH),
        }
    }
}

impl std::fmt::Debug for InMemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRecordStore")
            .field("user_count", &self.user_count())
            .field("task_count", &self.task_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn user(id: i64) -> User {
        User::new(Uid::from(id), false, None, today())
    }

    fn task(name: &str, points: i64) -> Task {
        Task::new(TaskName::parse(name).unwrap(), points, "", None, Utc::now())
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn insert_if_absent_does_not_overwrite() {
        let store = InMemoryRecordStore::new();
        assert_eq!(
            store.insert_user_if_absent(&user(1)).await.unwrap(),
            InsertOutcome::Inserted
        );

        let mut changed = user(1);
        changed.task_point = 9_999;
        assert_eq!(
            store.insert_user_if_absent(&changed).await.unwrap(),
            InsertOutcome::AlreadyPresent
        );
        let stored = store.find_user(&Uid::from(1)).await.unwrap().unwrap();
        assert_eq!(stored.task_point, 100);
    }

    #[tokio::test]
    async fn update_missing_user_reports_no_match() {
        let store = InMemoryRecordStore::new();
        let out = store
            .update_user(&UserFilter::uid(&Uid::from(1)), &UserUpdate::new().inc_fleet(1))
            .await
            .unwrap();
        assert_eq!(out, UpdateOutcome::NO_MATCH);
    }

    #[tokio::test]
    async fn conditional_update_is_gated_by_filter() {
        let store = InMemoryRecordStore::new();
        store.insert_user_if_absent(&user(1)).await.unwrap();
        let t = TaskName::parse("t").unwrap();
        let filter = UserFilter::uid(&Uid::from(1)).lacking_task(&t);
        let update = UserUpdate::new().add_completed_task(&t).inc_task_point(20);

        assert!(store.update_user(&filter, &update).await.unwrap().matched);
        assert!(!store.update_user(&filter, &update).await.unwrap().matched);

        let stored = store.find_user(&Uid::from(1)).await.unwrap().unwrap();
        assert_eq!(stored.task_point, 120);
    }

    #[tokio::test]
    async fn find_and_update_returns_post_image() {
        let store = InMemoryRecordStore::new();
        store.insert_user_if_absent(&user(1)).await.unwrap();
        let after = store
            .find_and_update_user(
                &UserFilter::uid(&Uid::from(1)),
                &UserUpdate::new().inc_fleet(-1).inc_task_point(-30),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.fleet, 2);
        assert_eq!(after.task_point, 70);
    }

    #[tokio::test]
    async fn overflowing_update_is_rejected_and_store_stays_usable() {
        let store = Arc::new(InMemoryRecordStore::new());
        store.insert_user_if_absent(&user(1)).await.unwrap();
        let filter = UserFilter::uid(&Uid::from(1));
        let update = UserUpdate::new().inc_task_point(i64::MAX).inc_fleet(-1);

        let spawned = {
            let store = Arc::clone(&store);
            let (filter, update) = (filter.clone(), update.clone());
            tokio::spawn(async move { store.find_and_update_user(&filter, &update).await })
        };
        let err = spawned.await.unwrap().unwrap_err();
        assert!(err.is_overflow());
        assert!(store.update_user(&filter, &update).await.unwrap_err().is_overflow());

        let stored = store.find_user(&Uid::from(1)).await.unwrap().unwrap();
        assert_eq!((stored.task_point, stored.fleet), (100, 3));
        assert_eq!(
            store.insert_user_if_absent(&user(9)).await.unwrap(),
            InsertOutcome::Inserted
        );
    }

    #[tokio::test]
    async fn find_users_returns_everyone() {
        let store = InMemoryRecordStore::new();
        for id in 0..5 {
            store.insert_user_if_absent(&user(id)).await.unwrap();
        }
        assert_eq!(store.find_users().await.unwrap().len(), 5);
        assert_eq!(store.user_count(), 5);
    }

    #[tokio::test]
    async fn concurrent_inserts_produce_one_winner() {
        let store = Arc::new(InMemoryRecordStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.insert_user_if_absent(&user(1)).await.unwrap()
            }));
        }
        let mut inserted = 0;
        for h in handles {
            if h.await.unwrap().is_inserted() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.user_count(), 1);
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn task_insert_and_query() {
        let store = InMemoryRecordStore::new();
        store.insert_task_if_absent(&task("a", 1)).await.unwrap();
        let mut inactive = task("b", 2);
        inactive.active = false;
        store.insert_task_if_absent(&inactive).await.unwrap();

        assert_eq!(store.find_tasks(&TaskQuery::all()).await.unwrap().len(), 2);
        let active = store.find_tasks(&TaskQuery::active()).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].task_name.as_str(), "a");
    }

    #[tokio::test]
    async fn task_update_adds_member_once() {
        let store = InMemoryRecordStore::new();
        let name = TaskName::parse("a").unwrap();
        store.insert_task_if_absent(&task("a", 1)).await.unwrap();
        let update = TaskUpdate::new().add_completed_by(&Uid::from(3));

        assert!(store.update_task(&name, &update).await.unwrap().modified);
        let again = store.update_task(&name, &update).await.unwrap();
        assert!(again.matched);
        assert!(!again.modified);

        let stored = store.find_task(&name).await.unwrap().unwrap();
        assert_eq!(stored.completed_by.len(), 1);
    }

    #[tokio::test]
    async fn update_missing_task_reports_no_match() {
        let store = InMemoryRecordStore::new();
        let out = store
            .update_task(
                &TaskName::parse("ghost").unwrap(),
                &TaskUpdate::new().record_completion(Utc::now()),
            )
            .await
            .unwrap();
        assert!(!out.matched);
    }
}

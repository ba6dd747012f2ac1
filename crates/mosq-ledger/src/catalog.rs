use std::sync::Arc;

use mosq_store::{RecordStore, TaskQuery};
use mosq_types::{Task, TaskName};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{LedgerError, LedgerResult};

/// Result of [`TaskCatalog::register_task`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    /// The stored task, whichever call created it.
    pub task: Task,
    /// `true` if this call created the task.
    pub created: bool,
}

/// Idempotent registry of completable tasks.
#[derive(Clone)]
pub struct TaskCatalog {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl TaskCatalog {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create the task unless one with the same name exists, then return
    /// the stored record. An existing task is never modified.
    pub async fn register_task(
        &self,
        name: &TaskName,
        points: i64,
        link: &str,
        description: Option<&str>,
    ) -> LedgerResult<Registration> {
        let task = Task::new(
            name.clone(),
            points,
            link,
            description.map(str::to_string),
            self.clock.now(),
        );
        let created = match self.store.insert_task_if_absent(&task).await {
            Ok(outcome) => outcome.is_inserted(),
            Err(e) if e.is_duplicate_key() => false,
            Err(e) => return Err(e.into()),
        };

        let task = self.store.find_task(name).await?.ok_or_else(|| {
            LedgerError::StoreUnavailable(format!("task {name} missing after registration"))
        })?;
        if created {
            info!(task = %name, points = task.task_point, "task registered");
        } else {
            debug!(task = %name, "task already registered");
        }
        Ok(Registration { task, created })
    }

    pub async fn get_task(&self, name: &TaskName) -> LedgerResult<Task> {
        self.store
            .find_task(name)
            .await?
            .ok_or_else(|| LedgerError::TaskNotFound(name.clone()))
    }

    /// Every task with `active == true`, unordered.
    pub async fn list_active_tasks(&self) -> LedgerResult<Vec<Task>> {
        Ok(self.store.find_tasks(&TaskQuery::active()).await?)
    }
}

impl std::fmt::Debug for TaskCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskCatalog").finish_non_exhaustive()
    }
}

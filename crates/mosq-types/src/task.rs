use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{TaskName, Uid};

/// A completable catalog task.
///
/// `total_completions` and `last_completed_at` are denormalized counters kept
/// best-effort; `completed_by` is the authoritative membership set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_name: TaskName,
    pub task_point: i64,
    #[serde(default)]
    pub task_link: String,
    #[serde(default)]
    pub task_description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_by: BTreeSet<Uid>,
    #[serde(default)]
    pub handled: bool,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub total_completions: i64,
    #[serde(default)]
    pub last_completed_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Task {
    pub fn new(
        task_name: TaskName,
        task_point: i64,
        task_link: impl Into<String>,
        task_description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_name,
            task_point,
            task_link: task_link.into(),
            task_description: task_description.unwrap_or_default(),
            created_at,
            completed_by: BTreeSet::new(),
            handled: false,
            active: true,
            total_completions: 0,
            last_completed_at: None,
        }
    }
}

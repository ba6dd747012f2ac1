//! Filters and update documents understood by every backend.
//!
//! These mirror the small subset of document-store operators the ledger
//! needs: equality on the key, "array does not contain", equality on the
//! check-in date, `$inc`, `$set` and `$addToSet`.

use chrono::{DateTime, NaiveDate, Utc};
use mosq_types::{Task, TaskName, Uid, User};

use crate::error::{StoreError, StoreResult};

/// Result of an insert-if-absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No record existed; this call wrote it.
    Inserted,
    /// A record with the same key was already present; nothing was written.
    AlreadyPresent,
}

impl InsertOutcome {
    pub fn is_inserted(self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// Result of a conditional update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// The filter matched a document (and the update was applied to it).
    pub matched: bool,
    /// At least one field actually changed.
    pub modified: bool,
}

impl UpdateOutcome {
    pub const NO_MATCH: Self = Self {
        matched: false,
        modified: false,
    };
}

/// Selects a single user document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserFilter {
    pub uid: Uid,
    /// Only match if `completed_tasks` does not already contain this task.
    pub lacks_task: Option<TaskName>,
    /// Only match if the stored check-in date equals this day.
    pub checkin_on: Option<NaiveDate>,
}

impl UserFilter {
    pub fn uid(uid: &Uid) -> Self {
        Self {
            uid: uid.clone(),
            lacks_task: None,
            checkin_on: None,
        }
    }

    pub fn lacking_task(mut self, task: &TaskName) -> Self {
        self.lacks_task = Some(task.clone());
        self
    }

    pub fn checked_in_on(mut self, day: NaiveDate) -> Self {
        self.checkin_on = Some(day);
        self
    }

    pub fn matches(&self, user: &User) -> bool {
        if user.uid != self.uid {
            return false;
        }
        if let Some(task) = &self.lacks_task {
            if user.completed_tasks.contains(task) {
                return false;
            }
        }
        if let Some(day) = self.checkin_on {
            if user.checkin != day {
                return false;
            }
        }
        true
    }
}

/// Atomic modifications to a user document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub inc_referrals: i64,
    pub inc_task_point: i64,
    pub inc_fleet: i64,
    pub set_checkin: Option<NaiveDate>,
    pub add_completed_task: Option<TaskName>,
}

impl UserUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_referrals(mut self, by: i64) -> Self {
        self.inc_referrals = self.inc_referrals.saturating_add(by);
        self
    }

    pub fn inc_task_point(mut self, by: i64) -> Self {
        self.inc_task_point = self.inc_task_point.saturating_add(by);
        self
    }

    pub fn inc_fleet(mut self, by: i64) -> Self {
        self.inc_fleet = self.inc_fleet.saturating_add(by);
        self
    }

    pub fn set_checkin(mut self, day: NaiveDate) -> Self {
        self.set_checkin = Some(day);
        self
    }

    pub fn add_completed_task(mut self, task: &TaskName) -> Self {
        self.add_completed_task = Some(task.clone());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply to an in-memory record. Returns `true` if any field changed.
    ///
    /// Every increment is checked before anything is written; on overflow
    /// the record is left untouched.
    pub fn apply(&self, user: &mut User) -> StoreResult<bool> {
        let referrals = checked_inc("referrals", user.referrals, self.inc_referrals)?;
        let task_point = checked_inc("task_point", user.task_point, self.inc_task_point)?;
        let fleet = checked_inc("fleet", user.fleet, self.inc_fleet)?;

        let before = user.clone();
        user.referrals = referrals;
        user.task_point = task_point;
        user.fleet = fleet;
        if let Some(day) = self.set_checkin {
            user.checkin = day;
        }
        if let Some(task) = &self.add_completed_task {
            user.completed_tasks.insert(task.clone());
        }
        Ok(*user != before)
    }
}

/// Example-based task query. `None` fields match anything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub active: Option<bool>,
}

impl TaskQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn active() -> Self {
        Self { active: Some(true) }
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.active.map_or(true, |a| task.active == a)
    }
}

/// Atomic modifications to a task document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub add_completed_by: Option<Uid>,
    pub inc_total_completions: i64,
    pub set_last_completed_at: Option<DateTime<Utc>>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_completed_by(mut self, uid: &Uid) -> Self {
        self.add_completed_by = Some(uid.clone());
        self
    }

    /// Bump the denormalized completion counters.
    pub fn record_completion(mut self, at: DateTime<Utc>) -> Self {
        self.inc_total_completions = self.inc_total_completions.saturating_add(1);
        self.set_last_completed_at = Some(at);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply to an in-memory record, checked like [`UserUpdate::apply`].
    pub fn apply(&self, task: &mut Task) -> StoreResult<bool> {
        let total = checked_inc(
            "total_completions",
            task.total_completions,
            self.inc_total_completions,
        )?;

        let before = task.clone();
        if let Some(uid) = &self.add_completed_by {
            task.completed_by.insert(uid.clone());
        }
        task.total_completions = total;
        if let Some(at) = self.set_last_completed_at {
            task.last_completed_at = Some(at);
        }
        Ok(*task != before)
    }
}

fn checked_inc(field: &str, current: i64, by: i64) -> StoreResult<i64> {
    current
        .checked_add(by)
        .ok_or_else(|| StoreError::Overflow(format!("{field}: {current} + {by}")))
}

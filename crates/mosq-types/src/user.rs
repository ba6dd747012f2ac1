use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::identity::{TaskName, Uid};

/// Opening balance for a standard account.
pub const STANDARD_TASK_POINT: i64 = 100;
/// Opening balance for a premium account.
pub const PREMIUM_TASK_POINT: i64 = 150;
/// Opening fleet for every account.
pub const DEFAULT_FLEET: i64 = 3;
/// Points credited to an invitor when one of their invitees is created.
pub const REFERRAL_BONUS: i64 = 100;

/// A user's ledger record.
///
/// Field names match the persisted document layout. `completed_tasks` is a
/// set: membership means the task's points were already paid to this user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: Uid,
    /// The referring user, fixed at creation.
    #[serde(default)]
    pub invitor: Option<Uid>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub referrals: i64,
    pub task_point: i64,
    /// Gameplay resource. No floor is enforced; it can go negative.
    pub fleet: i64,
    /// Calendar day of the last credited check-in.
    pub checkin: NaiveDate,
    #[serde(default)]
    pub completed_tasks: BTreeSet<TaskName>,
    #[serde(default)]
    pub handled: bool,
}

impl User {
    /// Build a fresh record with opening balances. `today` seeds the check-in
    /// date, so a check-in on the day of creation credits nothing.
    pub fn new(uid: Uid, is_premium: bool, invitor: Option<Uid>, today: NaiveDate) -> Self {
        Self {
            uid,
            invitor,
            is_premium,
            referrals: 0,
            task_point: if is_premium {
                PREMIUM_TASK_POINT
            } else {
                STANDARD_TASK_POINT
            },
            fleet: DEFAULT_FLEET,
            checkin: today,
            completed_tasks: BTreeSet::new(),
            handled: false,
        }
    }

    /// Whole calendar days between the last check-in and `today`.
    ///
    /// Negative when the stored date lies in the future (clock moved back).
    pub fn days_since_checkin(&self, today: NaiveDate) -> i64 {
        (today - self.checkin).num_days()
    }

    pub fn has_completed(&self, task: &TaskName) -> bool {
        self.completed_tasks.contains(task)
    }
}

use std::sync::Arc;

use mosq_store::{InsertOutcome, RecordStore, TaskUpdate, UserFilter, UserUpdate};
use mosq_types::{TaskName, Uid, User, REFERRAL_BONUS};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::error::{LedgerError, LedgerResult};

/// Result of [`UserLedger::create_user`]. Both variants are success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExisted,
}

/// Result of [`UserLedger::complete_task`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// First completion for this user; `points` were added to the balance.
    Credited { points: i64 },
    /// The user already holds this task; nothing was paid.
    AlreadyCompleted,
}

/// Owns user identity, balances, referrals, check-ins and completion sets.
///
/// Every method is one logical unit of work against the shared store. The
/// ledger keeps no in-process state of its own, so any number of clones may
/// serve concurrent requests.
#[derive(Clone)]
pub struct UserLedger {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl UserLedger {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create `uid` with opening balances unless it already exists.
    ///
    /// The invitor is credited only when this call performed the insert. The
    /// insert and the credit are separate atomic updates; a failure between
    /// them leaves the invitee created without the invitor's credit.
    pub async fn create_user(
        &self,
        uid: &Uid,
        is_premium: bool,
        invitor: Option<&Uid>,
    ) -> LedgerResult<CreateOutcome> {
        let user = User::new(uid.clone(), is_premium, invitor.cloned(), self.clock.today());
        match self.store.insert_user_if_absent(&user).await {
            Ok(InsertOutcome::Inserted) => {}
            Ok(InsertOutcome::AlreadyPresent) => {
                debug!(uid = %uid, "user already exists");
                return Ok(CreateOutcome::AlreadyExisted);
            }
            Err(e) if e.is_duplicate_key() => {
                debug!(uid = %uid, "concurrent creation won the unique index");
                return Ok(CreateOutcome::AlreadyExisted);
            }
            Err(e) => return Err(e.into()),
        }
        info!(uid = %uid, premium = is_premium, "user created");

        if let Some(invitor) = invitor {
            if let Err(e) = self.credit_referral(uid, invitor).await {
                error!(uid = %uid, invitor = %invitor, error = %e, "referral credit lost");
                return Err(e);
            }
        }
        Ok(CreateOutcome::Created)
    }

    async fn credit_referral(&self, invitee: &Uid, invitor: &Uid) -> LedgerResult<()> {
        let update = UserUpdate::new()
            .inc_referrals(1)
            .inc_task_point(REFERRAL_BONUS);
        let outcome = self
            .store
            .update_user(&UserFilter::uid(invitor), &update)
            .await?;
        if outcome.matched {
            info!(invitee = %invitee, invitor = %invitor, "referral credited");
        } else {
            warn!(invitee = %invitee, invitor = %invitor, "invitor not found; referral credit skipped");
        }
        Ok(())
    }

    /// Settle a game round: add `amount` (any sign) to the balance and spend
    /// one fleet, in one update. Returns the record after settlement.
    pub async fn credit_task_points(&self, uid: &Uid, amount: i64) -> LedgerResult<User> {
        let update = UserUpdate::new().inc_task_point(amount).inc_fleet(-1);
        let user = self
            .store
            .find_and_update_user(&UserFilter::uid(uid), &update)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(uid.clone()))?;
        info!(uid = %uid, amount, balance = user.task_point, fleet = user.fleet, "game round settled");
        Ok(user)
    }

    /// Credit `task_name`'s points to `uid`, at most once per pair.
    ///
    /// The set-insertion and the increment are one update whose filter
    /// requires the task to be absent from `completed_tasks`, so only the
    /// call that actually inserts it pays. The task side is marked after;
    /// on a repeat call the mark is re-issued, which repairs a pairing lost
    /// to a crash between the two writes.
    pub async fn complete_task(&self, uid: &Uid, task_name: &TaskName) -> LedgerResult<Completion> {
        let task = self
            .store
            .find_task(task_name)
            .await?
            .ok_or_else(|| LedgerError::TaskNotFound(task_name.clone()))?;

        let gate = UserFilter::uid(uid).lacking_task(task_name);
        let credit = UserUpdate::new()
            .add_completed_task(task_name)
            .inc_task_point(task.task_point);
        let completion = if self.store.update_user(&gate, &credit).await?.matched {
            Completion::Credited {
                points: task.task_point,
            }
        } else if self.store.find_user(uid).await?.is_some() {
            Completion::AlreadyCompleted
        } else {
            return Err(LedgerError::UserNotFound(uid.clone()));
        };

        let mut mark = TaskUpdate::new().add_completed_by(uid);
        if matches!(completion, Completion::Credited { .. }) {
            mark = mark.record_completion(self.clock.now());
        }
        if !self.store.update_task(task_name, &mark).await?.matched {
            warn!(task = %task_name, uid = %uid, "task disappeared before completion was recorded");
        }

        match completion {
            Completion::Credited { points } => {
                info!(uid = %uid, task = %task_name, points, "task completion credited")
            }
            Completion::AlreadyCompleted => {
                debug!(uid = %uid, task = %task_name, "task already completed")
            }
        }
        Ok(completion)
    }

    /// Daily check-in: credit one fleet per calendar day since the last
    /// credited check-in, uncapped.
    ///
    /// The credit is conditional on the stored check-in date still being
    /// the one read, so concurrent check-ins pay the elapsed days once. A
    /// call that loses that race returns the winner's result.
    pub async fn check_in(&self, uid: &Uid) -> LedgerResult<User> {
        let today = self.clock.today();
        let user = self.get_user(uid).await?;

        let days = user.days_since_checkin(today);
        if days <= 0 {
            debug!(uid = %uid, "already checked in today");
            return Ok(user);
        }

        let filter = UserFilter::uid(uid).checked_in_on(user.checkin);
        let update = UserUpdate::new().inc_fleet(days).set_checkin(today);
        match self.store.find_and_update_user(&filter, &update).await? {
            Some(updated) => {
                info!(uid = %uid, days, fleet = updated.fleet, "check-in credited");
                Ok(updated)
            }
            None => {
                debug!(uid = %uid, "concurrent check-in already credited");
                self.get_user(uid).await
            }
        }
    }

    pub async fn get_user(&self, uid: &Uid) -> LedgerResult<User> {
        self.store
            .find_user(uid)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(uid.clone()))
    }

    /// Full, unordered snapshot of every user.
    pub async fn list_users(&self) -> LedgerResult<Vec<User>> {
        Ok(self.store.find_users().await?)
    }
}

impl std::fmt::Debug for UserLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserLedger").finish_non_exhaustive()
    }
}

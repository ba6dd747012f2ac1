use std::sync::Arc;

use mosq_ledger::{
    Clock, Completion, CreateOutcome, Registration, SystemClock, TaskCatalog, UserLedger,
};
use mosq_store::{InMemoryRecordStore, RecordStore};
use mosq_types::{Task, TaskName, Uid, User};
use tracing::debug;

use crate::error::EngineResult;
use crate::referral::referral_token;

/// Invitor recorded for users who arrive without a referral token.
pub const DEFAULT_FALLBACK_INVITOR: i64 = 1_896_706_785;

/// Result of [`RewardEngine::onboard`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Onboarding {
    pub outcome: CreateOutcome,
    /// The invitor recorded for a new user. `None` when the only candidate
    /// was the user themselves.
    pub invitor: Option<Uid>,
}

/// High-level rewards API.
///
/// Built once at process start around a shared store handle and cloned into
/// every request handler.
#[derive(Clone, Debug)]
pub struct RewardEngine {
    users: UserLedger,
    catalog: TaskCatalog,
    fallback_invitor: Uid,
}

impl RewardEngine {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: UserLedger::new(store.clone(), clock.clone()),
            catalog: TaskCatalog::new(store, clock),
            fallback_invitor: Uid::from(DEFAULT_FALLBACK_INVITOR),
        }
    }

    /// An engine over a fresh in-memory store on the UTC calendar.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(SystemClock::utc()),
        )
    }

    pub fn with_fallback_invitor(mut self, uid: Uid) -> Self {
        self.fallback_invitor = uid;
        self
    }

    pub fn fallback_invitor(&self) -> &Uid {
        &self.fallback_invitor
    }

    pub fn users(&self) -> &UserLedger {
        &self.users
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    // ---- Users ----

    /// First contact from the chat front end.
    ///
    /// The referral token from the `/start` text names the invitor; without
    /// one the fallback invitor is used. A user is never recorded as their
    /// own invitor.
    pub async fn onboard(
        &self,
        uid: &Uid,
        is_premium: bool,
        start_text: &str,
    ) -> EngineResult<Onboarding> {
        let invitor = referral_token(start_text)
            .filter(|token| token != uid)
            .unwrap_or_else(|| self.fallback_invitor.clone());
        let invitor = (&invitor != uid).then_some(invitor);
        debug!(uid = %uid, invitor = ?invitor, "onboarding");

        let outcome = self.register_user(uid, is_premium, invitor.as_ref()).await?;
        Ok(Onboarding { outcome, invitor })
    }

    /// Create a user with an explicit invitor.
    pub async fn register_user(
        &self,
        uid: &Uid,
        is_premium: bool,
        invitor: Option<&Uid>,
    ) -> EngineResult<CreateOutcome> {
        Ok(self.users.create_user(uid, is_premium, invitor).await?)
    }

    pub async fn user(&self, uid: &Uid) -> EngineResult<User> {
        Ok(self.users.get_user(uid).await?)
    }

    pub async fn all_users(&self) -> EngineResult<Vec<User>> {
        Ok(self.users.list_users().await?)
    }

    pub async fn check_in(&self, uid: &Uid) -> EngineResult<User> {
        Ok(self.users.check_in(uid).await?)
    }

    /// Settle a game round: unvalidated point delta, one fleet spent.
    pub async fn settle_game(&self, uid: &Uid, game_points: i64) -> EngineResult<User> {
        Ok(self.users.credit_task_points(uid, game_points).await?)
    }

    // ---- Tasks ----

    pub async fn complete_task(&self, uid: &Uid, task: &TaskName) -> EngineResult<Completion> {
        Ok(self.users.complete_task(uid, task).await?)
    }

    pub async fn register_task(
        &self,
        name: &TaskName,
        points: i64,
        link: &str,
        description: Option<&str>,
    ) -> EngineResult<Registration> {
        Ok(self
            .catalog
            .register_task(name, points, link, description)
            .await?)
    }

    pub async fn task(&self, name: &TaskName) -> EngineResult<Task> {
        Ok(self.catalog.get_task(name).await?)
    }

    pub async fn active_tasks(&self) -> EngineResult<Vec<Task>> {
        Ok(self.catalog.list_active_tasks().await?)
    }
}

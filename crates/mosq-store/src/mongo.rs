//! MongoDB-backed record store.
//!
//! Filters and updates are translated into single `update_one` /
//! `find_one_and_update` calls so each primitive stays one atomic document
//! operation on the server.

use async_trait::async_trait;
use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use mosq_types::{Task, TaskName, Uid, User};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::query::{InsertOutcome, TaskQuery, TaskUpdate, UpdateOutcome, UserFilter, UserUpdate};
use crate::traits::RecordStore;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";
/// Collection name for tasks
pub const TASK_COLLECTION: &str = "tasks";

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// Record store over two MongoDB collections.
///
/// The underlying `Client` is a connection pool; cloning the store shares it.
#[derive(Clone, Debug)]
pub struct MongoRecordStore {
    client: Client,
    users: Collection<User>,
    tasks: Collection<Task>,
}

impl MongoRecordStore {
    /// Connect, verify the server answers a ping, and bind the collections.
    pub async fn connect(uri: &str, db_name: &str) -> StoreResult<Self> {
        info!(db = db_name, "connecting to MongoDB");

        // Fail fast instead of hanging on an unreachable server.
        let timeout_uri = if uri.contains('?') {
            format!("{uri}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000")
        } else {
            format!("{uri}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000")
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to connect to MongoDB: {e}")))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Unavailable(format!("MongoDB ping failed: {e}")))?;

        info!(db = db_name, "connected to MongoDB");
        Ok(Self::from_client(client, db_name))
    }

    /// Bind to an already configured client.
    pub fn from_client(client: Client, db_name: &str) -> Self {
        let db = client.database(db_name);
        Self {
            users: db.collection(USER_COLLECTION),
            tasks: db.collection(TASK_COLLECTION),
            client,
        }
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn unique_index(field: &str) -> IndexModel {
    let mut keys = Document::new();
    keys.insert(field, 1_i32);
    IndexModel::builder()
        .keys(keys)
        .options(Some(
            IndexOptions::builder()
                .unique(true)
                .name(format!("{field}_unique"))
                .build(),
        ))
        .build()
}

/// Server error code for a rejected operator value, including `$inc`
/// results that leave the 64-bit range.
const BAD_VALUE: i32 = 2;

/// `true` for the server's rejection of an overflowing `$inc`.
fn is_inc_overflow(code: i32, message: &str) -> bool {
    code == BAD_VALUE && message.contains("$inc")
}

/// Map a driver error, singling out unique-key violations and counter
/// overflow.
fn classify(err: mongodb::error::Error, collection: &'static str, key: &str) -> StoreError {
    let (code, message) = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => (we.code, we.message.as_str()),
        ErrorKind::Command(ce) => (ce.code, ce.message.as_str()),
        _ => return StoreError::Unavailable(format!("{collection}: {err}")),
    };
    if code == DUPLICATE_KEY {
        StoreError::DuplicateKey {
            collection,
            key: key.to_string(),
        }
    } else if is_inc_overflow(code, message) {
        StoreError::Overflow(format!("{collection} {key}: {message}"))
    } else {
        StoreError::Unavailable(format!("{collection}: {err}"))
    }
}

fn unavailable(collection: &'static str) -> impl Fn(mongodb::error::Error) -> StoreError {
    move |e| StoreError::Unavailable(format!("{collection}: {e}"))
}

fn serialization(e: impl std::fmt::Display) -> StoreError {
    StoreError::Serialization(e.to_string())
}

pub(crate) fn user_filter_doc(filter: &UserFilter) -> Document {
    let mut d = doc! { "uid": filter.uid.as_str() };
    if let Some(task) = &filter.lacks_task {
        // `$ne` against an array field matches only if no element is equal.
        d.insert("completed_tasks", doc! { "$ne": task.as_str() });
    }
    if let Some(day) = filter.checkin_on {
        d.insert("checkin", day.to_string());
    }
    d
}

pub(crate) fn user_update_doc(update: &UserUpdate) -> Document {
    let mut inc = Document::new();
    if update.inc_referrals != 0 {
        inc.insert("referrals", update.inc_referrals);
    }
    if update.inc_task_point != 0 {
        inc.insert("task_point", update.inc_task_point);
    }
    if update.inc_fleet != 0 {
        inc.insert("fleet", update.inc_fleet);
    }

    let mut d = Document::new();
    if !inc.is_empty() {
        d.insert("$inc", inc);
    }
    if let Some(day) = update.set_checkin {
        d.insert("$set", doc! { "checkin": day.to_string() });
    }
    if let Some(task) = &update.add_completed_task {
        d.insert("$addToSet", doc! { "completed_tasks": task.as_str() });
    }
    d
}

pub(crate) fn task_update_doc(update: &TaskUpdate) -> StoreResult<Document> {
    let mut d = Document::new();
    if let Some(uid) = &update.add_completed_by {
        d.insert("$addToSet", doc! { "completed_by": uid.as_str() });
    }
    if update.inc_total_completions != 0 {
        d.insert("$inc", doc! { "total_completions": update.inc_total_completions });
    }
    if let Some(at) = update.set_last_completed_at {
        let at = bson::to_bson(&at).map_err(serialization)?;
        d.insert("$set", doc! { "last_completed_at": at });
    }
    Ok(d)
}

pub(crate) fn task_query_doc(query: &TaskQuery) -> Document {
    let mut d = Document::new();
    if let Some(active) = query.active {
        d.insert("active", active);
    }
    d
}

#[async_trait]
impl RecordStore for MongoRecordStore {
    async fn insert_user_if_absent(&self, user: &User) -> StoreResult<InsertOutcome> {
        let fields = bson::to_document(user).map_err(serialization)?;
        let result = self
            .users
            .update_one(doc! { "uid": user.uid.as_str() }, doc! { "$setOnInsert": fields })
            .upsert(true)
            .await
            .map_err(|e| classify(e, USER_COLLECTION, user.uid.as_str()))?;

        Ok(if result.upserted_id.is_some() {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyPresent
        })
    }

    async fn find_user(&self, uid: &Uid) -> StoreResult<Option<User>> {
        self.users
            .find_one(doc! { "uid": uid.as_str() })
            .await
            .map_err(unavailable(USER_COLLECTION))
    }

    async fn find_users(&self) -> StoreResult<Vec<User>> {
        let cursor = self
            .users
            .find(doc! {})
            .await
            .map_err(unavailable(USER_COLLECTION))?;
        cursor
            .try_collect()
            .await
            .map_err(unavailable(USER_COLLECTION))
    }

    async fn update_user(
        &self,
        filter: &UserFilter,
        update: &UserUpdate,
    ) -> StoreResult<UpdateOutcome> {
        let filter_doc = user_filter_doc(filter);
        if update.is_empty() {
            let found = self
                .users
                .find_one(filter_doc)
                .await
                .map_err(unavailable(USER_COLLECTION))?;
            return Ok(UpdateOutcome {
                matched: found.is_some(),
                modified: false,
            });
        }

        let result = self
            .users
            .update_one(filter_doc, user_update_doc(update))
            .await
            .map_err(|e| classify(e, USER_COLLECTION, filter.uid.as_str()))?;
        debug!(
            uid = %filter.uid,
            matched = result.matched_count,
            modified = result.modified_count,
            "user update"
        );
        Ok(UpdateOutcome {
            matched: result.matched_count > 0,
            modified: result.modified_count > 0,
        })
    }

    async fn find_and_update_user(
        &self,
        filter: &UserFilter,
        update: &UserUpdate,
    ) -> StoreResult<Option<User>> {
        let filter_doc = user_filter_doc(filter);
        if update.is_empty() {
            return self
                .users
                .find_one(filter_doc)
                .await
                .map_err(unavailable(USER_COLLECTION));
        }

        self.users
            .find_one_and_update(filter_doc, user_update_doc(update))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| classify(e, USER_COLLECTION, filter.uid.as_str()))
    }

    async fn insert_task_if_absent(&self, task: &Task) -> StoreResult<InsertOutcome> {
        let fields = bson::to_document(task).map_err(serialization)?;
        let result = self
            .tasks
            .update_one(
                doc! { "task_name": task.task_name.as_str() },
                doc! { "$setOnInsert": fields },
            )
            .upsert(true)
            .await
            .map_err(|e| classify(e, TASK_COLLECTION, task.task_name.as_str()))?;

        Ok(if result.upserted_id.is_some() {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyPresent
        })
    }

    async fn find_task(&self, name: &TaskName) -> StoreResult<Option<Task>> {
        self.tasks
            .find_one(doc! { "task_name": name.as_str() })
            .await
            .map_err(unavailable(TASK_COLLECTION))
    }

    async fn find_tasks(&self, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let cursor = self
            .tasks
            .find(task_query_doc(query))
            .await
            .map_err(unavailable(TASK_COLLECTION))?;
        cursor
            .try_collect()
            .await
            .map_err(unavailable(TASK_COLLECTION))
    }

    async fn update_task(
        &self,
        name: &TaskName,
        update: &TaskUpdate,
    ) -> StoreResult<UpdateOutcome> {
        let filter = doc! { "task_name": name.as_str() };
        if update.is_empty() {
            let found = self
                .tasks
                .find_one(filter)
                .await
                .map_err(unavailable(TASK_COLLECTION))?;
            return Ok(UpdateOutcome {
                matched: found.is_some(),
                modified: false,
            });
        }

        let result = self
            .tasks
            .update_one(filter, task_update_doc(update)?)
            .await
            .map_err(|e| classify(e, TASK_COLLECTION, name.as_str()))?;
        Ok(UpdateOutcome {
            matched: result.matched_count > 0,
            modified: result.modified_count > 0,
        })
    }

    async fn ensure_indexes(&self) -> StoreResult<()> {
        self.users
            .create_index(unique_index("uid"))
            .await
            .map_err(unavailable(USER_COLLECTION))?;
        self.tasks
            .create_index(unique_index("task_name"))
            .await
            .map_err(unavailable(TASK_COLLECTION))?;
        info!("record store indexes ensured");
        Ok(())
    }
}

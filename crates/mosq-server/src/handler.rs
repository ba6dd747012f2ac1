use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::Json;
use mosq_engine::{Completion, CreateOutcome, RewardEngine, TaskName, Uid};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ServerError, ServerResult};

/// A uid as clients send it: chat ids arrive as JSON numbers, anything else
/// as a string.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum UidParam {
    Number(i64),
    Text(String),
}

impl UidParam {
    fn into_uid(self) -> ServerResult<Uid> {
        match self {
            Self::Number(n) => Ok(Uid::from(n)),
            Self::Text(s) => Uid::parse(&s).map_err(|e| ServerError::InvalidField {
                field: "user_id",
                reason: e.to_string(),
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserRequest {
    pub user_id: Option<UidParam>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddTaskRequest {
    pub task_name: Option<String>,
    pub task_point: Option<i64>,
    pub task_link: Option<String>,
    pub task_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskCompleteRequest {
    pub user_id: Option<UidParam>,
    pub task_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EndGameRequest {
    pub user_id: Option<UidParam>,
    pub game_points: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    pub user_id: Option<UidParam>,
    #[serde(default)]
    pub is_premium: bool,
    pub text: Option<String>,
}

fn require<T>(value: Option<T>, field: &'static str) -> ServerResult<T> {
    value.ok_or(ServerError::MissingField(field))
}

fn require_uid(value: Option<UidParam>) -> ServerResult<Uid> {
    require(value, "user_id")?.into_uid()
}

fn require_task_name(value: Option<String>) -> ServerResult<TaskName> {
    TaskName::parse(&require(value, "task_name")?).map_err(|e| ServerError::InvalidField {
        field: "task_name",
        reason: e.to_string(),
    })
}

fn data<T: Serialize>(value: T) -> Json<Value> {
    Json(json!({ "data": value }))
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn info_handler() -> Json<Value> {
    Json(json!({
        "name": "mosq-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /start`: first contact from the chat front end.
pub async fn start_handler(
    State(engine): State<RewardEngine>,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(req) = payload?;
    let uid = require_uid(req.user_id)?;
    let text = req.text.unwrap_or_else(|| "/start".into());
    let onboarding = engine.onboard(&uid, req.is_premium, &text).await?;
    Ok(data(json!({
        "created": onboarding.outcome == CreateOutcome::Created,
        "invitor": onboarding.invitor,
    })))
}

/// `POST /add_task`: register a task; an existing task is returned as-is.
pub async fn add_task_handler(
    State(engine): State<RewardEngine>,
    payload: Result<Json<AddTaskRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(req) = payload?;
    let name = require_task_name(req.task_name)?;
    let points = require(req.task_point, "task_point")?;
    let link = req.task_link.unwrap_or_default();
    let reg = engine
        .register_task(&name, points, &link, req.task_description.as_deref())
        .await?;
    Ok(data(json!({ "created": reg.created, "task": reg.task })))
}

/// `POST /task_complete`: credit a task's points once per user.
pub async fn task_complete_handler(
    State(engine): State<RewardEngine>,
    payload: Result<Json<TaskCompleteRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(req) = payload?;
    let uid = require_uid(req.user_id)?;
    let name = require_task_name(req.task_name)?;
    let body = match engine.complete_task(&uid, &name).await? {
        Completion::Credited { points } => json!({ "status": "credited", "points": points }),
        Completion::AlreadyCompleted => json!({ "status": "already_completed" }),
    };
    Ok(data(body))
}

/// `POST /check_in`
pub async fn check_in_handler(
    State(engine): State<RewardEngine>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(req) = payload?;
    let uid = require_uid(req.user_id)?;
    Ok(data(engine.check_in(&uid).await?))
}

/// `POST /user_data` with a JSON body.
pub async fn user_data_handler(
    State(engine): State<RewardEngine>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(req) = payload?;
    let uid = require_uid(req.user_id)?;
    Ok(data(engine.user(&uid).await?))
}

/// `GET /user_data?user_id=...`
pub async fn user_data_query_handler(
    State(engine): State<RewardEngine>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ServerResult<Json<Value>> {
    let Query(q) = query?;
    let uid = require_uid(q.user_id.map(UidParam::Text))?;
    Ok(data(engine.user(&uid).await?))
}

/// `GET /get_all_users`
pub async fn all_users_handler(State(engine): State<RewardEngine>) -> ServerResult<Json<Value>> {
    Ok(data(engine.all_users().await?))
}

/// `GET /tasks`: active tasks only.
pub async fn tasks_handler(State(engine): State<RewardEngine>) -> ServerResult<Json<Value>> {
    Ok(data(engine.active_tasks().await?))
}

/// `POST /end_game`: add the round's points and spend one fleet.
pub async fn end_game_handler(
    State(engine): State<RewardEngine>,
    payload: Result<Json<EndGameRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(req) = payload?;
    let uid = require_uid(req.user_id)?;
    let points = require(req.game_points, "game_points")?;
    Ok(data(engine.settle_game(&uid, points).await?))
}

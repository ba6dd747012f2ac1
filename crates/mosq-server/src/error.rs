use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mosq_engine::EngineError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("malformed request body: {0}")]
    Body(#[from] JsonRejection),

    #[error("malformed query: {0}")]
    Query(#[from] QueryRejection),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("store error: {0}")]
    Store(#[from] mosq_store::StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingField(_) | Self::InvalidField { .. } | Self::Body(_) | Self::Query(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Engine(EngineError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            Self::Engine(EngineError::UserNotFound(_) | EngineError::TaskNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Engine(EngineError::StoreUnavailable(_)) | Self::Store(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

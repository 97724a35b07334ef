//! HTTP error mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use refshelf_core::{Error, IngestError, IngestStage};

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    BadRequest {
        message: String,
        stage: Option<IngestStage>,
    },
    NotFound {
        message: String,
        stage: Option<IngestStage>,
    },
    /// Details are logged, never returned.
    Internal {
        detail: String,
        stage: Option<IngestStage>,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            stage: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn from_core(err: Error, stage: Option<IngestStage>) -> Self {
        match err {
            Error::Validation(message) => ApiError::BadRequest { message, stage },
            Error::Classification(e) => ApiError::BadRequest {
                message: e.to_string(),
                stage,
            },
            Error::NotFound(what) => ApiError::NotFound {
                message: format!("Not found: {}", what),
                stage,
            },
            e @ (Error::CollectionNotFound(_) | Error::ReferenceNotFound(_)) => {
                ApiError::NotFound {
                    message: e.to_string(),
                    stage,
                }
            }
            other => ApiError::Internal {
                detail: other.to_string(),
                stage,
            },
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::from_core(err, None)
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        ApiError::from_core(err.error, Some(err.stage))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, stage) = match self {
            ApiError::BadRequest { message, stage } | ApiError::NotFound { message, stage } => {
                (message, stage)
            }
            ApiError::Internal { detail, stage } => {
                error!(
                    subsystem = "api",
                    stage = ?stage,
                    error = %detail,
                    "Request failed"
                );
                (INTERNAL_MESSAGE.to_string(), stage)
            }
        };

        let body = match stage {
            Some(stage) => serde_json::json!({ "error": message, "stage": stage }),
            None => serde_json::json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

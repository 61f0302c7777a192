use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

use crate::features::invoices::repository::RepositoryError;
use crate::modules::storage::StorageError;
use crate::shared::constants::INTERNAL_ERROR_MESSAGE;
use crate::shared::types::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::Repository(ref e) => {
                tracing::error!("Repository error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    None,
                )
            }
            AppError::Storage(ref e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error occurred".to_string(),
                    None,
                )
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Validation(ref msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                Some(vec![msg.clone()]),
            ),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Auth(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Unauthorized(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, msg.clone(), None),
        };

        let body = Json(ApiResponse::<()>::error(Some(message), errors));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Errors of the upload endpoint.
///
/// The endpoint keeps its own wire shapes instead of the `ApiResponse` envelope:
/// `{ message }` for 400 and `{ message, error }` for 500.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Metadata(#[from] RepositoryError),

    #[error("Upload did not complete within {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Upload task failed: {0}")]
    Interrupted(String),
}

/// Body of a failed upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            UploadError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                UploadErrorBody {
                    message,
                    error: None,
                },
            ),
            UploadError::Storage(ref e) => {
                tracing::error!("Upload failed writing object: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    UploadErrorBody {
                        message: INTERNAL_ERROR_MESSAGE.to_string(),
                        error: Some(e.to_string()),
                    },
                )
            }
            UploadError::Metadata(ref e) => {
                tracing::error!("Upload failed writing metadata: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    UploadErrorBody {
                        message: INTERNAL_ERROR_MESSAGE.to_string(),
                        error: Some(e.to_string()),
                    },
                )
            }
            UploadError::Timeout(_) | UploadError::Interrupted(_) => {
                tracing::error!("Upload aborted: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    UploadErrorBody {
                        message: INTERNAL_ERROR_MESSAGE.to_string(),
                        error: Some(self.to_string()),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

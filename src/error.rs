use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::platform::PlatformError;
use crate::room::CreateRoomError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Platform error: {0}")]
    PlatformError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::PlatformError(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
        };

        let body = Json(json!({
            "error": error_message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<PlatformError> for AppError {
    fn from(err: PlatformError) -> Self {
        AppError::PlatformError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}

/// Precondition failures carry a message meant for the requester.
impl From<CreateRoomError> for AppError {
    fn from(err: CreateRoomError) -> Self {
        match err {
            CreateRoomError::RoomAlreadyExists => AppError::Conflict(err.to_string()),
            CreateRoomError::UserNotInVoice | CreateRoomError::UserNotInRoomCreationVoice => {
                AppError::BadRequest(err.to_string())
            }
            CreateRoomError::Platform(e) => e.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

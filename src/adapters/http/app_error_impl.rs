use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        tracing::error!(error = ?self, "Request failed");

        match self {
            AppError::Database(_) => {
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError, None)
            }
            AppError::InvalidCredentials => {
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::InvalidCredentials, None)
            }
            AppError::InvalidSignature => {
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::InvalidSignature, None)
            }
            AppError::InvalidInput(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, Some(msg))
            }
            AppError::ValidationError(msg) => error_resp(
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::ValidationError,
                Some(msg),
            ),
            AppError::PayoutNotAvailable => error_resp(
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::PayoutNotAvailable,
                None,
            ),
            AppError::Conflict(msg) => {
                error_resp(StatusCode::CONFLICT, ErrorCode::Conflict, Some(msg))
            }
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            AppError::ProviderNotConfigured => error_resp(
                StatusCode::NOT_FOUND,
                ErrorCode::ProviderNotConfigured,
                None,
            ),
            AppError::ProviderNotSupported => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::ProviderNotSupported,
                None,
            ),
            AppError::Provider(_) => {
                error_resp(StatusCode::BAD_GATEWAY, ErrorCode::ProviderError, None)
            }
            AppError::Internal(_) => {
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError, None)
            }
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}

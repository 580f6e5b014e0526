use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::api::ApiError;

/// A form field failed the checks done before anything is sent to the API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("the {0} is mandatory and cannot be left blank")]
    Blank(&'static str),
    #[error("the email format is invalid")]
    InvalidEmail,
}

/// AppError
///
/// Everything a page or action handler can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Api(ApiError::Status { status, .. }) => match *status {
                400 | 422 => StatusCode::UNPROCESSABLE_ENTITY,
                401 => StatusCode::UNAUTHORIZED,
                403 => StatusCode::FORBIDDEN,
                404 => StatusCode::NOT_FOUND,
                409 => StatusCode::CONFLICT,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::Api(_) => StatusCode::BAD_GATEWAY,
        };

        if status == StatusCode::BAD_GATEWAY {
            error!(error = %self, "PostLogs API call failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let message = match self {
            AppError::Api(ApiError::Status { message, .. }) if !message.is_empty() => message,
            other => other.to_string(),
        };

        (status, message).into_response()
    }
}

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use wanderworld_types::ValidationErrors;

use crate::views;

pub const DEFAULT_MESSAGE: &str = "Something went wrong";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Page Not Found")]
    NotFound,

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Session(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the error page shows. Server faults never leak their cause.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Session(_) | AppError::Internal(_) => DEFAULT_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{:#}", self);
        }

        let message = self.public_message();
        let body = views::render(
            "error",
            &json!({ "status_code": status.as_u16(), "message": message }),
        )
        .unwrap_or_else(|e| {
            error!("Failed to render error page: {:#}", e);
            message
        });

        (status, Html(body)).into_response()
    }
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use wanderworld_types::api::ReviewInput;
    use wanderworld_types::validation::validate_review;

    #[test]
    fn validation_errors_are_bad_requests_with_joined_messages() {
        let errors = validate_review(&ReviewInput::default()).unwrap_err();
        let err = AppError::from(errors);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.public_message(),
            "\"review.rating\" is required,\"review.comment\" is required"
        );
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let err = AppError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), DEFAULT_MESSAGE);
    }

    #[test]
    fn not_found_is_a_404() {
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NotFound.public_message(), "Page Not Found");
    }

    #[test]
    fn bad_request_renders_with_its_status() {
        let response = AppError::BadRequest("Invalid listing id".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

use axum::extract::{FromRequest, rejection::FormRejection};

use crate::error::AppError;

/// `axum::Form` whose rejection renders the error page.
#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(AppError))]
pub struct Form<T>(pub T);

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::auth::PasswordError;
use crate::store::StoreError;

use super::views;

/// Failures no handler recovers from. Expected outcomes (bad input, duplicate
/// username, wrong password, foreign card) never reach this type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
    #[error("password hashing failure: {0}")]
    Password(#[from] PasswordError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, views::failure()).into_response()
    }
}

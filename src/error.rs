use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::{password::PasswordError, store::StoreError, view};

/// Errors that end a request with an error page.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("todo with id {0} not found")]
    TodoNotFound(i64),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("failed to encode session: {0}")]
    Session(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AppError::Database(e),
            // Handlers deal with duplicates themselves; reaching here is a 400 all the same.
            StoreError::DuplicateUsername(_) => AppError::InvalidInput("username is already taken"),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidId(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::TodoNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Password(_)
            | AppError::Database(_)
            | AppError::Session(_)
            | AppError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "Something went wrong on our side. Please try again later.".to_string()
        } else {
            self.to_string()
        };

        (status, Html(view::error_page(status, &message))).into_response()
    }
}

/// Parse a numeric path id without trusting the client.
pub fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::InvalidId(raw.to_string()))
}

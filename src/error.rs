// Application error type and its HTTP mapping.
// Every handler error is answered with a JSON body `{ "error": "..." }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::query::QueryError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String), // Missing input the user has to resupply
    #[error("{0}")]
    NotFound(String), // Unknown brand or model
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<QueryError> for AppError {
    fn from(error: QueryError) -> Self {
        AppError::NotFound(error.to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::Internal(e) => {
                // Log the detailed error; the client only sees a generic message
                tracing::error!("Internal server error: {:?}", e);
                "Internal Server Error".to_string()
            }
            AppError::BadRequest(message) => {
                tracing::debug!("Bad request: {}", message);
                message
            }
            AppError::NotFound(message) => {
                tracing::debug!("Not found: {}", message);
                message
            }
        };

        (status, Json(json!({ "error": error_message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

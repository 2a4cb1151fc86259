use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rental_client::DbError;
use serde_json::json;

use crate::controllers::{ControllerError, ValidationError};

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error("{0}")]
    BadRequest(String),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Controller(e.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Controller(ControllerError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Controller(ControllerError::Db(e)) => match e {
                DbError::NotFound { .. } => StatusCode::NOT_FOUND,
                DbError::UnknownColumn { .. } | DbError::InvalidPage(_) => StatusCode::BAD_REQUEST,
                DbError::Sqlx(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

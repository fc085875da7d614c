use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::validation::ValidationErrors;

pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Route not found")]
    RouteNotFound,

    #[error("Too many requests from this IP, please try again later.")]
    RateLimited,

    /// The detail is only carried when the environment allows exposing it.
    #[error("Something went wrong!")]
    Internal(Option<String>),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            AppError::RouteNotFound => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(errors) => json!({
                "error": self.to_string(),
                "details": errors.details,
            }),
            AppError::MalformedPayload(reason) => json!({
                "error": "Malformed payload",
                "message": reason,
            }),
            AppError::RouteNotFound | AppError::RateLimited => json!({
                "error": self.to_string(),
            }),
            AppError::Internal(detail) => json!({
                "error": self.to_string(),
                "message": detail.as_deref().unwrap_or(GENERIC_INTERNAL_MESSAGE),
            }),
        };

        (status, Json(body)).into_response()
    }
}

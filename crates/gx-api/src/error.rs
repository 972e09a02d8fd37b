//! # ApiError
//!
//! Turns domain failures into HTTP responses with a `{"error": ...}` body.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use gx_core::AppError;
use gx_valuation::ValuationError;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    Core(AppError),
    Valuation(ValuationError),
    /// Request could not be decoded (bad JSON, bad path segment).
    BadRequest(String),
    /// A template failed to render.
    Render(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core(e) => write!(f, "{e}"),
            Self::Valuation(e) => write!(f, "{e}"),
            Self::BadRequest(msg) => write!(f, "bad request: {msg}"),
            Self::Render(msg) => write!(f, "render error: {msg}"),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::Core(err)
    }
}

impl From<ValuationError> for ApiError {
    fn from(err: ValuationError) -> Self {
        Self::Valuation(err)
    }
}

impl From<askama::Error> for ApiError {
    fn from(err: askama::Error) -> Self {
        Self::Render(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Core(AppError::ValidationError(_)) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Core(AppError::NotFound(..) | AppError::IndexOutOfRange { .. }) => StatusCode::NOT_FOUND,
            Self::Core(AppError::Persistence(_) | AppError::Internal(_)) | Self::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Valuation(ValuationError::MissingTicker) => StatusCode::BAD_REQUEST,
            Self::Valuation(ValuationError::UnknownTicker(_)) => StatusCode::NOT_FOUND,
            Self::Valuation(ValuationError::Source(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::debug!("rejected request: {self}");
        }
        HttpResponse::build(status).json(json!({ "error": self.to_string() }))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Error taxonomy for the request lifecycle API.
///
/// Business errors (`Validation`, `NotFound`, `NotFundable`, `Conflict`,
/// `Forbidden`) are surfaced to the caller as-is; they never trigger a retry
/// and never leave partial state behind. `Db`/`Pool`/`Json` are internal
/// faults and map to 500.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound,
    NotFundable,
    Conflict(String),
    Forbidden(String),
    Db(rusqlite::Error),
    Pool(r2d2::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(msg) => write!(f, "Validation error: {msg}"),
            ApiError::NotFound => write!(f, "Not found"),
            ApiError::NotFundable => write!(f, "Request not open/fundable"),
            ApiError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            ApiError::Db(e) => write!(f, "Database error: {e}"),
            ApiError::Pool(e) => write!(f, "Pool error: {e}"),
            ApiError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        // Body shape and status codes are part of the client compatibility
        // surface: {"detail": "<reason>"} with 400/403/404/409/500.
        match self {
            ApiError::Validation(msg) => {
                HttpResponse::BadRequest().json(json!({ "detail": msg }))
            }
            ApiError::NotFound => {
                HttpResponse::NotFound().json(json!({ "detail": "not found" }))
            }
            ApiError::NotFundable => HttpResponse::NotFound()
                .json(json!({ "detail": "request not open/fundable" })),
            ApiError::Conflict(msg) => {
                HttpResponse::Conflict().json(json!({ "detail": msg }))
            }
            ApiError::Forbidden(msg) => {
                HttpResponse::Forbidden().json(json!({ "detail": msg }))
            }
            _ => {
                log::error!("{self}");
                HttpResponse::InternalServerError()
                    .json(json!({ "detail": "internal error" }))
            }
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::Db(e)
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(e: r2d2::Error) -> Self {
        ApiError::Pool(e)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Json(e)
    }
}

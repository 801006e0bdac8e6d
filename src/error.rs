use std::collections::BTreeMap;

use actix_web::error::{InternalError, JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Every failure a handler can produce. The HTTP mapping lives in
/// [`ResponseError`] so handlers just bubble these up with `?`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Field-level validation failures, keyed by field name.
    #[error("validation failed")]
    Validation(BTreeMap<String, Vec<String>>),

    /// State conflict reported on the write path (duplicate review).
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Missing or unusable credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("permission denied")]
    Forbidden,

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Confirmation mail could not be handed to the backend.
    #[error("mail delivery failed: {0}")]
    Mail(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Single-field validation error.
    pub fn field(name: &str, message: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(name.to_string(), vec![message.to_string()]);
        Self::Validation(fields)
    }

    pub fn not_found() -> Self {
        Self::NotFound("Not found.".to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (field, kind) in errors.into_errors() {
            if let validator::ValidationErrorsKind::Field(items) = kind {
                let messages = items
                    .into_iter()
                    .map(|e| match e.message {
                        Some(msg) => msg.into_owned(),
                        None => format!("Invalid value ({}).", e.code),
                    })
                    .collect();
                fields.insert(field.to_string(), messages);
            }
        }
        Self::Validation(fields)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Mail(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Validation(fields) => HttpResponse::BadRequest().json(fields),
            ApiError::Conflict(detail) => HttpResponse::BadRequest().json(json!({ "detail": detail })),
            ApiError::Unauthorized(detail) => {
                HttpResponse::Unauthorized().json(json!({ "detail": detail }))
            }
            ApiError::Forbidden => HttpResponse::Forbidden().json(json!({
                "detail": "You do not have permission to perform this action."
            })),
            ApiError::NotFound(detail) => HttpResponse::NotFound().json(json!({ "detail": detail })),
            ApiError::Database(err) => {
                tracing::error!(error = %err, "database failure");
                internal_response()
            }
            ApiError::Mail(err) => {
                tracing::error!(error = %err, "mail delivery failure");
                internal_response()
            }
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "internal failure");
                internal_response()
            }
        }
    }
}

fn internal_response() -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({ "detail": "Internal server error." }))
}

/// Malformed JSON bodies (bad syntax, missing keys, wrong types) answer 400
/// with a `detail` body instead of actix's plain-text default.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let detail = format!("JSON parse error: {err}");
    let response = HttpResponse::BadRequest().json(json!({ "detail": detail }));
    InternalError::from_response(err, response).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let detail = format!("Invalid query parameter: {err}");
    let response = HttpResponse::BadRequest().json(json!({ "detail": detail }));
    InternalError::from_response(err, response).into()
}

//! Errors surfaced by the access layer and how they become HTTP responses.
//!
//! Every failure reaches the client as a status code plus a JSON body of the
//! form `{"error": "<message>"}`; the message is passed through as is.
use actix_web::{
    error::JsonPayloadError, http::StatusCode, HttpRequest, HttpResponse, ResponseError,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug, PartialEq)]
pub enum ApiError {
    /// A body that is not JSON at all.
    #[error("{0}")]
    MalformedBody(String),
    /// Missing required field, enum violation or a value that does not cast.
    #[error("{0}")]
    Validation(String),
    /// Duplicate unique key.
    #[error("{0}")]
    Conflict(String),
    /// Credential mismatch.
    #[error("{0}")]
    Unauthorized(String),
    /// Anything the store could not do.
    #[error("{0}")]
    Storage(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedBody(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Storage(message) => tracing::error!("store failure: {message}"),
            ApiError::Validation(message) => tracing::debug!("rejected record: {message}"),
            _ => {}
        }
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { .. } => ApiError::Conflict(err.to_string()),
            StoreError::Encode(_) => ApiError::Validation(err.to_string()),
            StoreError::Mongo(_) | StoreError::Decode(_) => ApiError::Storage(err.to_string()),
        }
    }
}

/// Bodies that fail to parse as JSON are bad requests. Bodies that parse but
/// do not fit the record (missing fields, unknown enum values, wrong types)
/// fail validation like a rejected save.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    match err {
        JsonPayloadError::Deserialize(inner) if inner.is_syntax() || inner.is_eof() => {
            ApiError::MalformedBody(inner.to_string()).into()
        }
        JsonPayloadError::Deserialize(inner) => ApiError::Validation(inner.to_string()).into(),
        other => ApiError::Validation(other.to_string()).into(),
    }
}

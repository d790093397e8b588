//! Request outcome errors
//!
//! Every failure a request can end in, with its HTTP status and the message that
//! goes into the `{"error": ...}` envelope. Store failures carry their cause for
//! logging only; the client sees the static context message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::response::write_error;
use super::routes::PathError;
use crate::storage::StoreError;
use crate::types::IdError;

/// Result type for request handling
pub type ApiResult<T> = Result<T, ApiError>;

/// Request-level errors
#[derive(Error, Debug)]
pub enum ApiError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Id segment is valid hex but not a usable id
    #[error("Invalid document id")]
    InvalidId(#[source] IdError),

    /// POST/PUT without a JSON object body
    #[error("Request body required")]
    MissingBody,

    /// Body sent to DELETE on a document
    #[error("Request body not allowed")]
    BodyNotAllowed,

    /// Body is not valid JSON or not an object
    #[error("Malformed JSON body")]
    MalformedBody,

    /// Query string could not be decoded
    #[error("Malformed query string")]
    MalformedQuery,

    /// Path segment is not percent-encoded UTF-8
    #[error("Malformed request path")]
    MalformedPath(#[source] PathError),

    /// Body stream failed before it was fully read
    #[error("Error reading request body")]
    BodyUnreadable(String),

    /// Body exceeds the configured limit
    #[error("Request body too large")]
    BodyTooLarge,

    /// No document matched
    #[error("Document not found")]
    NotFound,

    /// No route matched the method and path
    #[error("No route for {method} {path}")]
    NoRoute {
        /// Request method
        method: String,
        /// Request path
        path: String,
    },

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Id is not decodable hex, or a body `_id` could not be decoded
    #[error("Error decoding document id")]
    MalformedId(#[source] IdError),

    /// Query filters on a collection listing
    #[error("Querying is not supported yet")]
    UnsupportedQuery,

    /// Body sent to DELETE on a collection or database
    #[error("DELETE with parameters not supported yet")]
    UnsupportedBody,

    /// Store call failed
    #[error("{context}")]
    Store {
        /// Public description of the failed operation
        context: &'static str,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// JSON encoding of a result failed
    #[error("Error stringifying query result")]
    Serialization(#[source] serde_json::Error),

    /// Failure outside any handler, e.g. a panicked worker
    #[error("Internal error")]
    Internal(String),
}

impl ApiError {
    /// Wrap a store error with the public description of what was attempted
    pub fn store(context: &'static str) -> impl FnOnce(StoreError) -> ApiError {
        move |source| ApiError::Store { context, source }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            ApiError::InvalidId(_)
            | ApiError::MissingBody
            | ApiError::BodyNotAllowed
            | ApiError::MalformedBody
            | ApiError::MalformedQuery
            | ApiError::MalformedPath(_)
            | ApiError::BodyUnreadable(_) => StatusCode::BAD_REQUEST,

            // 404 Not Found
            ApiError::NotFound | ApiError::NoRoute { .. } => StatusCode::NOT_FOUND,

            // 413 Payload Too Large
            ApiError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            // 500 Internal Server Error
            ApiError::MalformedId(_)
            | ApiError::UnsupportedQuery
            | ApiError::UnsupportedBody
            | ApiError::Store { .. }
            | ApiError::Serialization(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Emit a log line at a level matching who is at fault
    pub fn log(&self) {
        match self {
            ApiError::Store { context, source } => {
                tracing::error!(error = %source, "{}", context);
            }
            ApiError::Serialization(e) => tracing::error!(error = %e, "{}", self),
            ApiError::Internal(detail) => tracing::error!(detail = %detail, "{}", self),
            ApiError::InvalidId(e) | ApiError::MalformedId(e) => {
                tracing::debug!(error = %e, "{}", self)
            }
            ApiError::MalformedPath(e) => tracing::debug!(error = %e, "{}", self),
            ApiError::BodyUnreadable(detail) => tracing::debug!(detail = %detail, "{}", self),
            _ => tracing::debug!("{}", self),
        }
    }
}

/// Split id codec failures by kind: malformed hex is a 500, a bad value a 400
impl From<IdError> for ApiError {
    fn from(err: IdError) -> Self {
        match err {
            IdError::MalformedHex(_) => ApiError::MalformedId(err),
            IdError::InvalidValue(_) => ApiError::InvalidId(err),
        }
    }
}

impl From<PathError> for ApiError {
    fn from(err: PathError) -> Self {
        ApiError::MalformedPath(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        write_error(self.status_code(), &self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::MissingBody.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::UnsupportedQuery.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::BodyTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::BodyUnreadable("connection reset".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        let path = ApiError::from(PathError::InvalidEncoding("%FF".into()));
        assert_eq!(path.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(path.to_string(), "Malformed request path");
    }

    #[test]
    fn test_id_error_mapping() {
        let malformed = ApiError::from(IdError::MalformedHex("x".into()));
        assert_eq!(malformed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let invalid = ApiError::from(IdError::InvalidValue("x".into()));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_error_hides_cause() {
        let err = ApiError::store("Error getting database names")(StoreError::Backend(
            "socket closed at 10.0.0.3".into(),
        ));
        assert_eq!(err.to_string(), "Error getting database names");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

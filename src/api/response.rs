//! Response writer
//!
//! Every response leaves through [`write_success`] or [`write_error`]: JSON content
//! type, exact `Content-Length`, and either a JSON payload or an empty body.

use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Serialize;

use super::error::{ApiError, ApiResult};

const APPLICATION_JSON: &str = "application/json";

/// Used if the error envelope itself fails to encode
const FALLBACK_ERROR: &[u8] = br#"{"error":"Internal error"}"#;

/// Successful handler outcome, written by [`write_success`]
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Response status
    pub status: StatusCode,
    /// Encoded JSON payload, if any
    pub body: Option<Bytes>,
}

impl Reply {
    /// Reply with a JSON-encoded payload
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> ApiResult<Self> {
        let body = serde_json::to_vec(value).map_err(ApiError::Serialization)?;
        Ok(Self {
            status,
            body: Some(Bytes::from(body)),
        })
    }

    /// Reply without a payload
    pub fn empty(status: StatusCode) -> Self {
        Self { status, body: None }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Write a success response; no body means `Content-Length: 0`
pub fn write_success(status: StatusCode, body: Option<Bytes>) -> Response {
    write(status, body.unwrap_or_default())
}

/// Write an `{"error": message}` response
pub fn write_error(status: StatusCode, message: &str) -> Response {
    let body = serde_json::to_vec(&ErrorBody { error: message })
        .map(Bytes::from)
        .unwrap_or_else(|_| Bytes::from_static(FALLBACK_ERROR));
    write(status, body)
}

/// Write the response for a finished handler
pub fn finish(outcome: ApiResult<Reply>) -> Response {
    match outcome {
        Ok(reply) => write_success(reply.status, reply.body),
        Err(err) => err.into_response(),
    }
}

fn write(status: StatusCode, body: Bytes) -> Response {
    let headers = [
        (CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON)),
        (CONTENT_LENGTH, HeaderValue::from(body.len())),
    ];
    (status, headers, body).into_response()
}

//! Bound request context
//!
//! Everything a handler may look at: captured path parameters, the query string
//! as a multimap, and the parsed JSON object body when one was sent.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, FailedToBufferBody};
use axum::extract::{FromRequest, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Uri};
use serde_json::Value;

use super::error::{ApiError, ApiResult};
use super::routes::PathParams;
use crate::types::Fields;

/// Query flag selecting raw string ids when set to `false`
pub const HEX_ID_PARAM: &str = "hexId";

/// Query parameters, repeats allowed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(HashMap<String, Vec<String>>);

impl QueryParams {
    /// Decode the query string of `uri`
    pub fn from_uri(uri: &Uri) -> ApiResult<Self> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map_err(|_| ApiError::MalformedQuery)?;

        let mut params: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in pairs {
            params.entry(name).or_default().push(value);
        }
        Ok(Self(params))
    }

    /// First value given for `name`
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    /// Whether no parameters were sent
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in iter {
            params.entry(name.into()).or_default().push(value.into());
        }
        Self(params)
    }
}

/// Per-request values handed to a handler
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Captured path parameters
    pub params: PathParams,
    /// Decoded query string
    pub query: QueryParams,
    /// Parsed JSON object body
    pub body: Option<Fields>,
}

impl RequestContext {
    /// A captured path parameter; the route table guarantees required captures
    pub fn param(&self, name: &str) -> ApiResult<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ApiError::Internal(format!("route did not bind :{}", name)))
    }

    /// Whether id segments should be read as hex binary ids
    pub fn hex_ids(&self) -> bool {
        self.query.first(HEX_ID_PARAM) != Some("false")
    }

    /// Whether any query parameter was sent
    pub fn has_query(&self) -> bool {
        !self.query.is_empty()
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// Read and parse a JSON object body.
///
/// The size limit comes from the router's `DefaultBodyLimit` layer. Bodies without
/// a JSON content type are not read and count as absent, as does an empty JSON body.
pub async fn parse_body(request: Request) -> ApiResult<Option<Fields>> {
    if !is_json(request.headers()) {
        return Ok(None);
    }

    let bytes = match Bytes::from_request(request, &()).await {
        Ok(bytes) => bytes,
        Err(BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_))) => {
            return Err(ApiError::BodyTooLarge);
        }
        Err(e) => return Err(ApiError::BodyUnreadable(e.body_text())),
    };
    if bytes.is_empty() {
        return Ok(None);
    }

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(fields)) => Ok(Some(fields)),
        Ok(_) | Err(_) => Err(ApiError::MalformedBody),
    }
}

//! Conversion of authentication errors into HTTP responses.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use serde::Serialize;

use crate::error::AuthenticationError;
use crate::message::{MessageContext, Response};

/// Turns a failed request into a response.
///
/// The runtime calls the handler for module errors, caught panics and
/// invalid statuses. The handler must always produce a response.
pub trait ResponseHandler: Send + Sync {
    /// Builds the response for `error`.
    fn handle(&self, ctx: &MessageContext, error: &AuthenticationError) -> Response;
}

/// Renders an error in one media type.
pub trait ResponseWriter: Send + Sync {
    /// Media type this writer produces, e.g. `application/json`.
    fn media_type(&self) -> &str;

    /// Renders the response for `error`.
    fn write(&self, error: &AuthenticationError) -> Response;
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: u16,
    reason: &'a str,
    message: &'a str,
}

/// Writes `{"code", "reason", "message"}` JSON bodies.
///
/// The status is the error's status hint, or `500` without one.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonResponseWriter;

impl ResponseWriter for JsonResponseWriter {
    fn media_type(&self) -> &str {
        "application/json"
    }

    fn write(&self, error: &AuthenticationError) -> Response {
        let status = error.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default(),
            message: error.message(),
        };

        let bytes = match serde_json::to_vec(&body) {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize error body");
                Bytes::new()
            }
        };

        let mut response = Response::new(bytes);
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

/// Picks a [`ResponseWriter`] by the request's `Accept` header.
///
/// Media ranges are tried in the order the client listed them; `type/*` and
/// `*/*` match any writer of that type. When nothing matches, or the request
/// has no `Accept` header, the first writer is used.
///
/// # Examples
///
/// ```
/// use authn_filter::{AuthenticationError, DefaultResponseHandler, MessageContext,
///     Request, ResponseHandler};
/// use http::StatusCode;
///
/// let handler = DefaultResponseHandler::new();
/// let ctx = MessageContext::new("req-1", Request::default());
/// let err = AuthenticationError::new("denied").with_status(StatusCode::FORBIDDEN);
///
/// let response = handler.handle(&ctx, &err);
/// assert_eq!(response.status(), StatusCode::FORBIDDEN);
/// assert_eq!(response.headers()["content-type"], "application/json");
/// ```
#[derive(Clone)]
pub struct DefaultResponseHandler {
    writers: Vec<Arc<dyn ResponseWriter>>,
}

impl DefaultResponseHandler {
    /// Creates a handler with a single [`JsonResponseWriter`].
    pub fn new() -> Self {
        Self {
            writers: vec![Arc::new(JsonResponseWriter)],
        }
    }

    /// Creates a handler from explicit writers; the first one is the
    /// fallback. An empty list falls back to JSON.
    pub fn with_writers(writers: Vec<Arc<dyn ResponseWriter>>) -> Self {
        if writers.is_empty() {
            return Self::new();
        }
        Self { writers }
    }

    /// Appends a writer.
    #[must_use]
    pub fn with_writer(mut self, writer: Arc<dyn ResponseWriter>) -> Self {
        self.writers.push(writer);
        self
    }

    /// Returns the media types of the registered writers in order.
    pub fn media_types(&self) -> Vec<&str> {
        self.writers.iter().map(|w| w.media_type()).collect()
    }

    fn select(&self, accept: Option<&str>) -> Option<&Arc<dyn ResponseWriter>> {
        let ranges = accept.into_iter().flat_map(|value| value.split(','));
        for range in ranges {
            let range = range.split(';').next().unwrap_or_default().trim();
            if range.is_empty() {
                continue;
            }
            if let Some(writer) = self.writers.iter().find(|w| matches_range(range, w.media_type())) {
                return Some(writer);
            }
        }
        self.writers.first()
    }
}

impl Default for DefaultResponseHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseHandler for DefaultResponseHandler {
    fn handle(&self, ctx: &MessageContext, error: &AuthenticationError) -> Response {
        let accept = ctx
            .request()
            .headers()
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok());

        match self.select(accept) {
            Some(writer) => writer.write(error),
            None => JsonResponseWriter.write(error),
        }
    }
}

impl std::fmt::Debug for DefaultResponseHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultResponseHandler")
            .field("writers", &self.media_types())
            .finish()
    }
}

fn matches_range(range: &str, media_type: &str) -> bool {
    if range == "*/*" || range.eq_ignore_ascii_case(media_type) {
        return true;
    }
    match (range.strip_suffix("/*"), media_type.split_once('/')) {
        (Some(kind), Some((media_kind, _))) => kind.eq_ignore_ascii_case(media_kind),
        _ => false,
    }
}

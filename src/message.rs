use std::collections::HashMap;

use bytes::Bytes;

use crate::audit::AuditTrail;

/// HTTP request as seen by the runtime and its modules.
pub type Request = http::Request<Bytes>;

/// HTTP response as seen by the runtime and its modules.
pub type Response = http::Response<Bytes>;

/// Scratch mapping shared between modules and the runtime for one request.
pub type ContextMap = HashMap<String, serde_json::Value>;

/// Per-request carrier handed to every module.
///
/// A `MessageContext` is created by the runtime for each inbound request,
/// before any validation runs, and dropped when the request is finished. It
/// is never shared between requests.
///
/// Modules communicate with the runtime through it:
/// - a module that completes the dialog itself (`SEND_SUCCESS`,
///   `SEND_CONTINUE`) leaves its response in [`response_mut`](Self::response_mut)
/// - a module may publish the authenticated principal under
///   [`ATTRIBUTE_AUTH_PRINCIPAL`](crate::ATTRIBUTE_AUTH_PRINCIPAL) in the
///   [`request_context`](Self::request_context_mut) map
/// - module decisions are appended to the [`audit_trail`](Self::audit_trail_mut)
///
/// # Examples
///
/// ```
/// use authn_filter::{MessageContext, Request, ATTRIBUTE_AUTH_PRINCIPAL};
///
/// let mut ctx = MessageContext::new("req-1", Request::default());
/// ctx.request_context_mut()
///     .insert(ATTRIBUTE_AUTH_PRINCIPAL.to_string(), "alice".into());
///
/// assert_eq!(ctx.request_id(), "req-1");
/// assert_eq!(ctx.response().status(), http::StatusCode::OK);
/// ```
#[derive(Debug)]
pub struct MessageContext {
    request_id: String,
    request: Request,
    response: Response,
    request_context: ContextMap,
    audit_trail: AuditTrail,
    /// Index of the chain candidate that authenticated this request.
    pub(crate) authenticated_by: Option<usize>,
}

impl MessageContext {
    /// Creates the context for one request. The response starts as an empty
    /// `200 OK`.
    pub fn new(request_id: impl Into<String>, request: Request) -> Self {
        Self {
            request_id: request_id.into(),
            request,
            response: Response::default(),
            request_context: ContextMap::new(),
            audit_trail: AuditTrail::new(),
            authenticated_by: None,
        }
    }

    /// Returns the request identifier.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the request.
    ///
    /// While the request is dispatched this is a copy of the original head
    /// and body; extensions are not carried over.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the request for modification.
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Returns the current response.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Returns the current response for modification.
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Replaces the current response.
    pub fn set_response(&mut self, response: Response) {
        self.response = response;
    }

    /// Returns the scratch mapping.
    pub fn request_context(&self) -> &ContextMap {
        &self.request_context
    }

    /// Returns the scratch mapping for modification.
    pub fn request_context_mut(&mut self) -> &mut ContextMap {
        &mut self.request_context
    }

    /// Returns the audit trail of this request.
    pub fn audit_trail(&self) -> &AuditTrail {
        &self.audit_trail
    }

    /// Returns the audit trail for modification.
    pub fn audit_trail_mut(&mut self) -> &mut AuditTrail {
        &mut self.audit_trail
    }

    /// Moves the original request out for dispatch, keeping a copy of its
    /// head and body for the securing phase.
    pub(crate) fn detach_request(&mut self) -> Request {
        let copy = copy_request(&self.request);
        std::mem::replace(&mut self.request, copy)
    }

    /// Moves the current response out, leaving an empty one behind.
    pub(crate) fn take_response(&mut self) -> Response {
        std::mem::take(&mut self.response)
    }
}

fn copy_request(request: &Request) -> Request {
    let mut copy = Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}

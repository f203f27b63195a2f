use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::chain::ServerAuthContext;
use crate::message::ContextMap;

/// Key of the per-request identifier.
pub const ATTRIBUTE_REQUEST_ID: &str = "authn.request_id";

/// Key of the resolved principal name.
///
/// Modules use the same key in the [`MessageContext`](crate::MessageContext)
/// scratch map to publish the principal they authenticated.
pub const ATTRIBUTE_AUTH_PRINCIPAL: &str = "authn.principal";

/// Key of the authentication context: the module chain that handled the
/// request and the values its modules published.
pub const ATTRIBUTE_AUTH_CONTEXT: &str = "authn.context";

/// Typed attribute store shared with downstream handlers.
///
/// The runtime writes into it; the next handler and anything after it only
/// read. It carries:
/// - the request id, assigned once before validation and never changed
/// - the principal resolved after successful validation
/// - a reference to the module chain that authenticated the request
/// - a snapshot of the scratch map the modules filled during validation
///
/// # Examples
///
/// ```
/// use authn_filter::{AttributesContext, ATTRIBUTE_REQUEST_ID};
///
/// let ctx = AttributesContext::with_request_id("upstream-7");
///
/// assert_eq!(ctx.request_id(), Some("upstream-7"));
/// assert_eq!(ctx.attribute(ATTRIBUTE_REQUEST_ID), Some("upstream-7".into()));
/// assert!(ctx.principal().is_none());
/// ```
#[derive(Clone, Default)]
pub struct AttributesContext {
    request_id: Option<String>,
    principal: Option<String>,
    auth_context: Option<Arc<dyn ServerAuthContext>>,
    published: ContextMap,
}

impl AttributesContext {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose request id was assigned upstream.
    ///
    /// The runtime keeps an id it finds instead of generating a new one.
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..Self::default()
        }
    }

    /// Returns the request id, once assigned.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns the resolved principal name.
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Returns the module chain that authenticated the request.
    pub fn auth_context(&self) -> Option<&Arc<dyn ServerAuthContext>> {
        self.auth_context.as_ref()
    }

    /// Returns the values modules published during validation.
    pub fn published(&self) -> &ContextMap {
        &self.published
    }

    /// Looks an attribute up by key.
    ///
    /// [`ATTRIBUTE_AUTH_CONTEXT`] yields the published values as a JSON
    /// object; it is absent until a request has been authenticated.
    pub fn attribute(&self, key: &str) -> Option<Value> {
        match key {
            ATTRIBUTE_REQUEST_ID => self.request_id.clone().map(Value::String),
            ATTRIBUTE_AUTH_PRINCIPAL => self.principal.clone().map(Value::String),
            ATTRIBUTE_AUTH_CONTEXT => self.auth_context.as_ref().map(|_| {
                Value::Object(
                    self.published
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )
            }),
            _ => None,
        }
    }

    /// Returns the request id, generating it if none was assigned yet.
    pub(crate) fn assign_request_id(&mut self, generate: impl FnOnce() -> String) -> &str {
        self.request_id.get_or_insert_with(generate)
    }

    pub(crate) fn set_principal(&mut self, principal: Option<String>) {
        self.principal = principal;
    }

    pub(crate) fn set_auth_context(
        &mut self,
        auth_context: Arc<dyn ServerAuthContext>,
        published: ContextMap,
    ) {
        self.auth_context = Some(auth_context);
        self.published = published;
    }
}

impl fmt::Debug for AttributesContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributesContext")
            .field("request_id", &self.request_id)
            .field("principal", &self.principal)
            .field("auth_context", &self.auth_context.is_some())
            .field("published", &self.published.keys().collect::<Vec<_>>())
            .finish()
    }
}
